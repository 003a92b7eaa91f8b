//! The 64-byte firmware header prepended to AES-128-CBC images.
//!
//! Layout mirrors the bootloader's `firmware_aes_header_t`, all fields
//! little-endian:
//!
//! ```text
//! offset  size  field
//!      0     4  magic            0x41455331 ("AES1")
//!      4     4  header_version   1
//!      8     4  firmware_size    plaintext length
//!     12     4  encrypted_size   ciphertext length
//!     16     4  crc32            CRC-32 of the plaintext
//!     20     4  encrypted_crc32  CRC-32 of the ciphertext
//!     24    16  iv
//!     40    16  key_hash         MD5 of the AES key
//!     56     8  fw_version       four u16: major, minor, patch, build
//! ```

use openload_core::ServiceError;

/// Header magic, spells "AES1" when read as ASCII on the wire.
pub const FIRMWARE_HEADER_MAGIC: u32 = 0x41455331;

/// Current header layout version.
pub const FIRMWARE_HEADER_VERSION: u32 = 1;

/// Total header size in bytes.
pub const FIRMWARE_HEADER_SIZE: usize = 64;

/// Parsed (or to-be-written) AES-128 firmware header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareHeader {
    pub firmware_size: u32,
    pub encrypted_size: u32,
    pub crc32_plain: u32,
    pub crc32_cipher: u32,
    pub iv: [u8; 16],
    pub key_hash: [u8; 16],
    pub fw_version: (u16, u16, u16, u16),
}

impl FirmwareHeader {
    /// Serialize to the fixed 64-byte wire layout.
    pub fn to_bytes(&self) -> [u8; FIRMWARE_HEADER_SIZE] {
        let mut out = [0u8; FIRMWARE_HEADER_SIZE];
        out[0..4].copy_from_slice(&FIRMWARE_HEADER_MAGIC.to_le_bytes());
        out[4..8].copy_from_slice(&FIRMWARE_HEADER_VERSION.to_le_bytes());
        out[8..12].copy_from_slice(&self.firmware_size.to_le_bytes());
        out[12..16].copy_from_slice(&self.encrypted_size.to_le_bytes());
        out[16..20].copy_from_slice(&self.crc32_plain.to_le_bytes());
        out[20..24].copy_from_slice(&self.crc32_cipher.to_le_bytes());
        out[24..40].copy_from_slice(&self.iv);
        out[40..56].copy_from_slice(&self.key_hash);
        let (major, minor, patch, build) = self.fw_version;
        out[56..58].copy_from_slice(&major.to_le_bytes());
        out[58..60].copy_from_slice(&minor.to_le_bytes());
        out[60..62].copy_from_slice(&patch.to_le_bytes());
        out[62..64].copy_from_slice(&build.to_le_bytes());
        out
    }

    /// Parse a header from the front of an encrypted image.
    ///
    /// This is the bootloader's view of the bytes; the server uses it
    /// in tests and diagnostics.
    pub fn parse(data: &[u8]) -> Result<Self, ServiceError> {
        if data.len() < FIRMWARE_HEADER_SIZE {
            return Err(ServiceError::MalformedInput(format!(
                "firmware header truncated: {} bytes",
                data.len()
            )));
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != FIRMWARE_HEADER_MAGIC {
            return Err(ServiceError::MalformedInput(format!(
                "bad firmware header magic: 0x{:08X}",
                magic
            )));
        }

        let mut iv = [0u8; 16];
        iv.copy_from_slice(&data[24..40]);
        let mut key_hash = [0u8; 16];
        key_hash.copy_from_slice(&data[40..56]);

        Ok(FirmwareHeader {
            firmware_size: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
            encrypted_size: u32::from_le_bytes([data[12], data[13], data[14], data[15]]),
            crc32_plain: u32::from_le_bytes([data[16], data[17], data[18], data[19]]),
            crc32_cipher: u32::from_le_bytes([data[20], data[21], data[22], data[23]]),
            iv,
            key_hash,
            fw_version: (
                u16::from_le_bytes([data[56], data[57]]),
                u16::from_le_bytes([data[58], data[59]]),
                u16::from_le_bytes([data[60], data[61]]),
                u16::from_le_bytes([data[62], data[63]]),
            ),
        })
    }
}

/// Parse a firmware version string into the header's four components.
///
/// Accepts `v1.1.23.2025`, `1.1.23.2025`, `v1.1.23`, `1.2` and so on:
/// a leading `v` is stripped, missing trailing components default to
/// zero. Anything that doesn't parse falls back to `(1, 0, 0, 1)`.
pub fn parse_firmware_version(version: Option<&str>) -> (u16, u16, u16, u16) {
    const DEFAULT: (u16, u16, u16, u16) = (1, 0, 0, 1);

    let Some(version) = version else {
        return DEFAULT;
    };
    if version.is_empty() {
        return DEFAULT;
    }

    let clean = version.trim_start_matches('v');

    let mut parts = Vec::new();
    for part in clean.split('.') {
        match part.parse::<u16>() {
            Ok(n) => parts.push(n),
            Err(_) => return DEFAULT,
        }
    }

    while parts.len() < 4 {
        parts.push(0);
    }

    (parts[0], parts[1], parts[2], parts[3])
}
