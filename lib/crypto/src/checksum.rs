//! Content checksums for catalog records (md5/sha1/sha256).
//!
//! These are integrity digests over whole firmware images, stored as
//! lowercase hex in the sidecar. Not related to the bootloader CRC
//! (see [`crate::crc32`]).

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use openload_core::ServiceError;

/// Hash algorithm for content checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => Err(ServiceError::InvalidAlgorithm(format!(
                "unsupported hash algorithm: {}",
                other
            ))),
        }
    }
}

/// Compute the checksum of `data` as a lowercase hex digest.
pub fn calculate(data: &[u8], algo: HashAlgorithm) -> String {
    match algo {
        HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
        HashAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
    }
}

/// Verify `data` against an expected hex digest, case-insensitively.
/// Never fails: a digest mismatch of any kind is simply `false`.
pub fn verify(data: &[u8], expected_hex: &str, algo: HashAlgorithm) -> bool {
    calculate(data, algo).eq_ignore_ascii_case(expected_hex)
}
