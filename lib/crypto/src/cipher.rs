//! Firmware encryption and decryption.
//!
//! XOR and AES-CBC over whole in-memory images. The AES-128-CBC path
//! produces the complete bootloader image format: the 64-byte header
//! of [`crate::header`] followed by the ciphertext.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use openload_core::ServiceError;

use crate::algorithm::EncryptionAlgorithm;
use crate::crc32::crc32;
use crate::header::{FIRMWARE_HEADER_SIZE, FirmwareHeader, parse_firmware_version};
use crate::keys;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Open key/value metadata attached to an encryption result and
/// persisted in the catalog sidecar.
pub type EncryptionMetadata = Map<String, Value>;

/// Stateless engine for firmware encrypt/decrypt operations.
///
/// Constructed once and passed by reference; holds no global state.
/// Key-length validation is the caller's job (see
/// [`EncryptionAlgorithm::valid_key_length`]); the engine only
/// surfaces cipher-level failures.
#[derive(Debug, Default)]
pub struct CryptoEngine;

impl CryptoEngine {
    pub fn new() -> Self {
        Self
    }

    /// Generate key material for `algorithm` (see [`keys::generate_key`]).
    pub fn generate_key(&self, algorithm: EncryptionAlgorithm, password: Option<&str>) -> Vec<u8> {
        keys::generate_key(algorithm, password)
    }

    /// Encrypt a firmware image.
    ///
    /// An explicit `key` wins over `password`; with neither, a random
    /// key is drawn. `firmware_version` is only consulted by the
    /// AES-128 path, where it is written into the image header.
    ///
    /// Returns the output bytes and the metadata describing them.
    pub fn encrypt(
        &self,
        data: &[u8],
        algorithm: EncryptionAlgorithm,
        key: Option<&[u8]>,
        password: Option<&str>,
        firmware_version: Option<&str>,
    ) -> Result<(Vec<u8>, EncryptionMetadata), ServiceError> {
        if algorithm == EncryptionAlgorithm::None {
            let mut metadata = Map::new();
            metadata.insert("algorithm".into(), json!(algorithm.as_str()));
            return Ok((data.to_vec(), metadata));
        }

        let key = match key {
            Some(k) => k.to_vec(),
            None => keys::generate_key(algorithm, password),
        };

        let result = match algorithm {
            EncryptionAlgorithm::None => unreachable!("handled above"),

            EncryptionAlgorithm::Xor => {
                let mut metadata = Map::new();
                metadata.insert("algorithm".into(), json!(algorithm.as_str()));
                metadata.insert("key_length".into(), json!(key.len()));
                Ok((xor_bytes(data, &key), metadata))
            }

            EncryptionAlgorithm::Aes128Cbc => {
                self.encrypt_aes128_image(data, &key, firmware_version)
            }

            EncryptionAlgorithm::Aes256Cbc => {
                let iv = random_iv();
                let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
                    .map_err(|e| ServiceError::MalformedInput(format!("AES-256 init: {}", e)))?
                    .encrypt_padded_vec_mut::<Pkcs7>(data);

                let mut metadata = Map::new();
                metadata.insert("algorithm".into(), json!(algorithm.as_str()));
                metadata.insert("key_length".into(), json!(key.len()));
                metadata.insert("iv".into(), json!(hex::encode(iv)));
                metadata.insert("block_size".into(), json!(16));
                Ok((ciphertext, metadata))
            }
        };

        if let Err(ref e) = result {
            error!("firmware encryption failed ({}): {}", algorithm, e);
        }
        result
    }

    /// Decrypt a firmware image (raw ciphertext, header already
    /// stripped for AES-128 bootloader images).
    pub fn decrypt(
        &self,
        data: &[u8],
        algorithm: EncryptionAlgorithm,
        key: &[u8],
        metadata: &EncryptionMetadata,
    ) -> Result<Vec<u8>, ServiceError> {
        match algorithm {
            EncryptionAlgorithm::None => Ok(data.to_vec()),

            // XOR is its own inverse.
            EncryptionAlgorithm::Xor => Ok(xor_bytes(data, key)),

            EncryptionAlgorithm::Aes128Cbc | EncryptionAlgorithm::Aes256Cbc => {
                let iv = decode_iv(metadata)?;

                let plaintext = match algorithm {
                    EncryptionAlgorithm::Aes128Cbc => Aes128CbcDec::new_from_slices(key, &iv)
                        .map_err(|e| {
                            ServiceError::MalformedInput(format!("AES-128 init: {}", e))
                        })?
                        .decrypt_padded_vec_mut::<Pkcs7>(data),
                    _ => Aes256CbcDec::new_from_slices(key, &iv)
                        .map_err(|e| {
                            ServiceError::MalformedInput(format!("AES-256 init: {}", e))
                        })?
                        .decrypt_padded_vec_mut::<Pkcs7>(data),
                };

                plaintext
                    .map_err(|_| ServiceError::Padding("invalid PKCS7 padding".to_string()))
            }
        }
    }

    /// AES-128-CBC in the bootloader image format: 64-byte header
    /// followed by the PKCS7-padded ciphertext.
    fn encrypt_aes128_image(
        &self,
        data: &[u8],
        key: &[u8],
        firmware_version: Option<&str>,
    ) -> Result<(Vec<u8>, EncryptionMetadata), ServiceError> {
        let iv = random_iv();
        let ciphertext = Aes128CbcEnc::new_from_slices(key, &iv)
            .map_err(|e| ServiceError::MalformedInput(format!("AES-128 init: {}", e)))?
            .encrypt_padded_vec_mut::<Pkcs7>(data);

        let crc32_plain = crc32(data);
        let crc32_cipher = crc32(&ciphertext);
        debug!(
            "AES-128 image: {} plaintext bytes, crc32 0x{:08X}",
            data.len(),
            crc32_plain
        );

        let key_hash: [u8; 16] = Md5::digest(key).into();

        let header = FirmwareHeader {
            firmware_size: data.len() as u32,
            encrypted_size: ciphertext.len() as u32,
            crc32_plain,
            crc32_cipher,
            iv,
            key_hash,
            fw_version: parse_firmware_version(firmware_version),
        };

        let mut image = Vec::with_capacity(FIRMWARE_HEADER_SIZE + ciphertext.len());
        image.extend_from_slice(&header.to_bytes());
        image.extend_from_slice(&ciphertext);

        let mut metadata = Map::new();
        metadata.insert("algorithm".into(), json!(EncryptionAlgorithm::Aes128Cbc.as_str()));
        metadata.insert("key_length".into(), json!(key.len()));
        metadata.insert("iv".into(), json!(hex::encode(iv)));
        metadata.insert("block_size".into(), json!(16));
        metadata.insert("firmware_size".into(), json!(data.len()));
        metadata.insert("encrypted_size".into(), json!(ciphertext.len()));
        metadata.insert("header_size".into(), json!(FIRMWARE_HEADER_SIZE));

        Ok((image, metadata))
    }
}

/// Rolling XOR; with an empty key the data passes through unchanged.
fn xor_bytes(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

fn random_iv() -> [u8; 16] {
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut iv);
    iv
}

fn decode_iv(metadata: &EncryptionMetadata) -> Result<[u8; 16], ServiceError> {
    let iv_hex = metadata
        .get("iv")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::MissingParameter("AES decrypt requires an IV".to_string()))?;

    let bytes = hex::decode(iv_hex)
        .map_err(|e| ServiceError::MalformedInput(format!("bad IV hex: {}", e)))?;

    <[u8; 16]>::try_from(bytes.as_slice()).map_err(|_| {
        ServiceError::MalformedInput(format!("IV must be 16 bytes, got {}", bytes.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CryptoEngine {
        CryptoEngine::new()
    }

    #[test]
    fn none_is_passthrough() {
        let (out, meta) = engine()
            .encrypt(b"plain", EncryptionAlgorithm::None, None, None, None)
            .unwrap();
        assert_eq!(out, b"plain");
        assert_eq!(meta["algorithm"], "none");

        let back = engine()
            .decrypt(&out, EncryptionAlgorithm::None, &[], &meta)
            .unwrap();
        assert_eq!(back, b"plain");
    }

    #[test]
    fn xor_roundtrip() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let key: &[u8] = b"secret";
        let (cipher, meta) = engine()
            .encrypt(data, EncryptionAlgorithm::Xor, Some(key), None, None)
            .unwrap();
        assert_ne!(cipher, data.to_vec());
        assert_eq!(meta["key_length"], 6);

        let plain = engine()
            .decrypt(&cipher, EncryptionAlgorithm::Xor, key, &meta)
            .unwrap();
        assert_eq!(plain, data.to_vec());
    }

    #[test]
    fn xor_key_wraps_around() {
        let (cipher, _) = engine()
            .encrypt(&[0u8; 4], EncryptionAlgorithm::Xor, Some(&[1u8, 2][..]), None, None)
            .unwrap();
        assert_eq!(cipher, vec![1, 2, 1, 2]);
    }

    #[test]
    fn aes256_roundtrip() {
        let data = b"firmware payload that is not block aligned";
        let key = [7u8; 32];
        let (cipher, meta) = engine()
            .encrypt(data, EncryptionAlgorithm::Aes256Cbc, Some(key.as_slice()), None, None)
            .unwrap();
        assert_eq!(cipher.len() % 16, 0);
        assert_eq!(meta["block_size"], 16);
        assert_eq!(meta["key_length"], 32);
        assert!(meta.get("header_size").is_none());

        let plain = engine()
            .decrypt(&cipher, EncryptionAlgorithm::Aes256Cbc, &key, &meta)
            .unwrap();
        assert_eq!(plain, data.to_vec());
    }

    #[test]
    fn aes128_image_has_header_and_roundtrips() {
        let data = b"bootable firmware bytes";
        let key = [3u8; 16];
        let (image, meta) = engine()
            .encrypt(
                data,
                EncryptionAlgorithm::Aes128Cbc,
                Some(key.as_slice()),
                None,
                Some("v2.1.5.2024"),
            )
            .unwrap();

        let header = FirmwareHeader::parse(&image).unwrap();
        assert_eq!(header.firmware_size as usize, data.len());
        assert_eq!(header.crc32_plain, crc32(data));
        assert_eq!(header.fw_version, (2, 1, 5, 2024));
        assert_eq!(header.key_hash, <[u8; 16]>::from(Md5::digest(key)));

        let ciphertext = &image[FIRMWARE_HEADER_SIZE..];
        assert_eq!(header.encrypted_size as usize, ciphertext.len());
        assert_eq!(header.crc32_cipher, crc32(ciphertext));

        assert_eq!(meta["firmware_size"], data.len());
        assert_eq!(meta["encrypted_size"], ciphertext.len());
        assert_eq!(meta["header_size"], 64);

        // IV in the header matches the metadata copy.
        assert_eq!(hex::encode(header.iv), meta["iv"].as_str().unwrap());

        let plain = engine()
            .decrypt(ciphertext, EncryptionAlgorithm::Aes128Cbc, &key, &meta)
            .unwrap();
        assert_eq!(plain, data.to_vec());
    }

    #[test]
    fn aes128_password_derivation_roundtrip() {
        let data = b"image encrypted via password";
        let (image, meta) = engine()
            .encrypt(
                data,
                EncryptionAlgorithm::Aes128Cbc,
                None,
                Some("fleet-password"),
                None,
            )
            .unwrap();

        let key = keys::derive_key_stm32("fleet-password");
        let plain = engine()
            .decrypt(
                &image[FIRMWARE_HEADER_SIZE..],
                EncryptionAlgorithm::Aes128Cbc,
                &key,
                &meta,
            )
            .unwrap();
        assert_eq!(plain, data.to_vec());
    }

    #[test]
    fn aes_decrypt_requires_iv() {
        let meta = Map::new();
        let err = engine()
            .decrypt(&[0u8; 16], EncryptionAlgorithm::Aes128Cbc, &[1u8; 16], &meta)
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_PARAMETER");
    }

    #[test]
    fn aes_decrypt_rejects_bad_iv_hex() {
        let mut meta = Map::new();
        meta.insert("iv".into(), json!("zz not hex"));
        let err = engine()
            .decrypt(&[0u8; 16], EncryptionAlgorithm::Aes128Cbc, &[1u8; 16], &meta)
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INPUT");
    }

    #[test]
    fn tampered_ciphertext_fails_padding() {
        let key = [9u8; 16];
        let (image, meta) = engine()
            .encrypt(b"data", EncryptionAlgorithm::Aes128Cbc, Some(key.as_slice()), None, None)
            .unwrap();

        let mut ciphertext = image[FIRMWARE_HEADER_SIZE..].to_vec();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;

        let err = engine()
            .decrypt(&ciphertext, EncryptionAlgorithm::Aes128Cbc, &key, &meta)
            .unwrap_err();
        assert_eq!(err.error_code(), "PADDING_ERROR");
    }

    #[test]
    fn wrong_key_length_is_rejected_by_cipher_init() {
        let err = engine()
            .encrypt(b"data", EncryptionAlgorithm::Aes128Cbc, Some(&[1u8; 8][..]), None, None)
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INPUT");
    }
}
