use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use openload_core::ServiceError;

/// Firmware encryption algorithm.
///
/// The string tags are a wire format: they appear in the catalog
/// sidecar and are what the device-side bootloader is configured
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "xor")]
    Xor,
    #[serde(rename = "aes-128-cbc")]
    Aes128Cbc,
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
}

impl Default for EncryptionAlgorithm {
    fn default() -> Self {
        Self::None
    }
}

impl EncryptionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::None => "none",
            EncryptionAlgorithm::Xor => "xor",
            EncryptionAlgorithm::Aes128Cbc => "aes-128-cbc",
            EncryptionAlgorithm::Aes256Cbc => "aes-256-cbc",
        }
    }

    /// Accepted key lengths in bytes, as an inclusive (min, max) range.
    /// None means the algorithm takes no key.
    pub fn key_length_range(&self) -> Option<(usize, usize)> {
        match self {
            EncryptionAlgorithm::None => None,
            EncryptionAlgorithm::Xor => Some((1, 32)),
            EncryptionAlgorithm::Aes128Cbc => Some((16, 16)),
            EncryptionAlgorithm::Aes256Cbc => Some((32, 32)),
        }
    }

    /// Whether `len` is an acceptable key length for this algorithm.
    pub fn valid_key_length(&self, len: usize) -> bool {
        match self.key_length_range() {
            Some((min, max)) => len >= min && len <= max,
            None => len == 0,
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(EncryptionAlgorithm::None),
            "xor" => Ok(EncryptionAlgorithm::Xor),
            "aes-128-cbc" => Ok(EncryptionAlgorithm::Aes128Cbc),
            "aes-256-cbc" => Ok(EncryptionAlgorithm::Aes256Cbc),
            other => Err(ServiceError::InvalidAlgorithm(format!(
                "unsupported encryption algorithm: {}",
                other
            ))),
        }
    }
}

/// Descriptor for one supported algorithm, as shown to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub key_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_length: Option<(usize, usize)>,
}

/// List the supported encryption algorithms with their key constraints.
pub fn supported_algorithms() -> Vec<AlgorithmInfo> {
    vec![
        AlgorithmInfo {
            id: EncryptionAlgorithm::None.as_str(),
            name: "No encryption",
            description: "Store the firmware image as-is",
            key_required: false,
            key_length: None,
        },
        AlgorithmInfo {
            id: EncryptionAlgorithm::Xor.as_str(),
            name: "XOR",
            description: "Simple rolling XOR obfuscation",
            key_required: true,
            key_length: EncryptionAlgorithm::Xor.key_length_range(),
        },
        AlgorithmInfo {
            id: EncryptionAlgorithm::Aes128Cbc.as_str(),
            name: "AES-128-CBC",
            description: "AES with a 128-bit key in CBC mode, bootloader header format",
            key_required: true,
            key_length: EncryptionAlgorithm::Aes128Cbc.key_length_range(),
        },
        AlgorithmInfo {
            id: EncryptionAlgorithm::Aes256Cbc.as_str(),
            name: "AES-256-CBC",
            description: "AES with a 256-bit key in CBC mode",
            key_required: true,
            key_length: EncryptionAlgorithm::Aes256Cbc.key_length_range(),
        },
    ]
}
