use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use openload_crypto::EncryptionAlgorithm;

use crate::version::FirmwareVersion;

/// One stored firmware binary and its encryption state.
///
/// Field names are the sidecar wire format; the sidecar must
/// round-trip losslessly across catalog restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirmwareRecord {
    /// Unique, stable id: `fw_{unix}_{file stem}`.
    pub id: String,

    /// On-disk file name inside the firmware directory.
    pub filename: String,

    /// Name the file was uploaded under.
    pub original_filename: String,

    /// Normalized four-component version string, e.g. "1.2.3.45".
    pub version: String,

    /// Current on-disk size in bytes.
    pub size: u64,

    /// Hex digest of the current on-disk content.
    pub checksum: String,

    /// RFC 3339 upload timestamp.
    pub upload_time: String,

    /// Target device tag, e.g. "STM32F103ZET6".
    pub target_device: String,

    #[serde(default)]
    pub is_encrypted: bool,

    #[serde(default)]
    pub encryption_algorithm: EncryptionAlgorithm,

    /// Cipher parameters: iv, key_hash, key_length, block_size,
    /// firmware_size, encrypted_size, header_size — and the plaintext
    /// password (or raw key hex) the device layer forwards to the
    /// bootloader.
    #[serde(default)]
    pub encryption_metadata: Map<String, Value>,

    /// Free-form caller metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl FirmwareRecord {
    /// Sort key for listings: version first, upload time as the
    /// tie-breaker. Callers reverse it for newest-first order.
    pub fn ordering_key(&self) -> (FirmwareVersion, String) {
        (FirmwareVersion::parse(&self.version), self.upload_time.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FirmwareRecord {
        FirmwareRecord {
            id: "fw_1725260000_boot_v1.2.3.45".into(),
            filename: "boot_v1.2.3.45.bin".into(),
            original_filename: "boot_v1.2.3.45.bin".into(),
            version: "1.2.3.45".into(),
            size: 2048,
            checksum: "d41d8cd98f00b204e9800998ecf8427e".into(),
            upload_time: "2024-09-02T08:00:00+00:00".into(),
            target_device: "STM32F103ZET6".into(),
            is_encrypted: true,
            encryption_algorithm: EncryptionAlgorithm::Aes128Cbc,
            encryption_metadata: {
                let mut m = Map::new();
                m.insert("iv".into(), json!("00112233445566778899aabbccddeeff"));
                m.insert("password".into(), json!("fleet-password"));
                m
            },
            metadata: Map::new(),
        }
    }

    #[test]
    fn sidecar_json_roundtrip() {
        let record = sample();
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: FirmwareRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn algorithm_serializes_as_wire_tag() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["encryption_algorithm"], "aes-128-cbc");
        assert_eq!(json["encryption_metadata"]["password"], "fleet-password");
    }

    #[test]
    fn encryption_fields_default_when_absent() {
        let json = json!({
            "id": "fw_1",
            "filename": "a.bin",
            "original_filename": "a.bin",
            "version": "1.0.0.0",
            "size": 10,
            "checksum": "abc",
            "upload_time": "2024-01-01T00:00:00+00:00",
            "target_device": "STM32F103ZET6"
        });
        let record: FirmwareRecord = serde_json::from_value(json).unwrap();
        assert!(!record.is_encrypted);
        assert_eq!(record.encryption_algorithm, EncryptionAlgorithm::None);
        assert!(record.encryption_metadata.is_empty());
    }

    #[test]
    fn ordering_key_uses_version_then_time() {
        let mut a = sample();
        let mut b = sample();
        a.version = "1.2.0.0".into();
        b.version = "1.1.9.9".into();
        assert!(a.ordering_key() > b.ordering_key());

        b.version = a.version.clone();
        b.upload_time = "2024-09-03T08:00:00+00:00".into();
        assert!(b.ordering_key() > a.ordering_key());
    }
}
