pub mod algorithm;
pub mod checksum;
pub mod cipher;
pub mod crc32;
pub mod header;
pub mod keys;

pub use algorithm::{AlgorithmInfo, EncryptionAlgorithm, supported_algorithms};
pub use checksum::HashAlgorithm;
pub use cipher::{CryptoEngine, EncryptionMetadata};
pub use crc32::crc32;
pub use header::{FIRMWARE_HEADER_SIZE, FirmwareHeader, parse_firmware_version};
pub use keys::{derive_key_stm32, generate_key};
