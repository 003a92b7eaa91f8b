//! The firmware catalog: persisted record index, version ordering and
//! the encrypt-in-place lifecycle.
//!
//! All records live in one in-memory map guarded by a mutex and are
//! written wholesale to a JSON sidecar on every mutation. That is a
//! deliberate scale trade-off: catalogs hold tens of images, not
//! millions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use blob::BlobStore;
use openload_core::{ServiceError, now_rfc3339, unix_now};
use openload_crypto::checksum::{self, HashAlgorithm};
use openload_crypto::{CryptoEngine, EncryptionAlgorithm};

use crate::model::FirmwareRecord;
use crate::version::{FirmwareVersion, extract_version_from_filename};

/// Sidecar file name inside the firmware directory.
pub const SIDECAR_FILE: &str = "metadata.json";

/// Aggregate storage counters (original `get_storage_info`).
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub firmware_count: usize,
    pub total_firmware_size: u64,
}

/// One row of a version listing.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub upload_time: String,
    pub is_encrypted: bool,
    pub is_latest: bool,
}

/// Version summary for one target device (or the whole catalog).
#[derive(Debug, Clone, Serialize)]
pub struct VersionListing {
    pub versions: Vec<VersionInfo>,
    pub count: usize,
    pub latest_version: Option<String>,
}

/// Persisted index of firmware records over a flat blob store.
pub struct FirmwareCatalog {
    store: Box<dyn BlobStore>,
    engine: CryptoEngine,
    default_target_device: String,
    records: Mutex<HashMap<String, FirmwareRecord>>,
}

impl FirmwareCatalog {
    /// Open a catalog over `store`.
    ///
    /// Loads the sidecar if one exists; otherwise scans the store for
    /// orphaned `.bin` images, synthesizes records for them and writes
    /// a fresh sidecar.
    pub fn open(
        store: Box<dyn BlobStore>,
        engine: CryptoEngine,
        default_target_device: &str,
    ) -> Result<Self, ServiceError> {
        let catalog = Self {
            store,
            engine,
            default_target_device: default_target_device.to_string(),
            records: Mutex::new(HashMap::new()),
        };
        catalog.load()?;
        Ok(catalog)
    }

    fn load(&self) -> Result<(), ServiceError> {
        let sidecar = self
            .store
            .get(SIDECAR_FILE)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        match sidecar {
            Some(bytes) => {
                let raw: HashMap<String, Value> = match serde_json::from_slice(&bytes) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("unreadable catalog sidecar, starting empty: {}", e);
                        return Ok(());
                    }
                };

                let mut records = self.records();
                for (id, value) in raw {
                    match serde_json::from_value::<FirmwareRecord>(value) {
                        Ok(record) => {
                            records.insert(id, record);
                        }
                        Err(e) => warn!("skipping firmware record {}: {}", id, e),
                    }
                }
                info!("loaded {} firmware records", records.len());
                Ok(())
            }
            None => self.scan_existing_files(),
        }
    }

    /// Synthesize records for firmware files that predate the sidecar.
    fn scan_existing_files(&self) -> Result<(), ServiceError> {
        let blobs = self
            .store
            .list(".bin")
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut records = self.records();
        for blob in blobs {
            let content = match self.store.get(&blob.name) {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(e) => {
                    warn!("skipping unreadable file {}: {}", blob.name, e);
                    continue;
                }
            };

            let id = format!("fw_{}_{}", unix_now(), file_stem(&blob.name));
            let mut metadata = Map::new();
            metadata.insert("scanned".into(), json!(true));
            metadata.insert("scan_time".into(), json!(now_rfc3339()));

            let record = FirmwareRecord {
                id: id.clone(),
                filename: blob.name.clone(),
                original_filename: blob.name.clone(),
                version: extract_version_from_filename(&blob.name),
                size: content.len() as u64,
                checksum: checksum::calculate(&content, HashAlgorithm::Md5),
                upload_time: now_rfc3339(),
                target_device: self.default_target_device.clone(),
                is_encrypted: false,
                encryption_algorithm: EncryptionAlgorithm::None,
                encryption_metadata: Map::new(),
                metadata,
            };
            records.insert(id, record);
        }

        if !records.is_empty() {
            info!("scanned {} firmware files without a sidecar", records.len());
            self.persist(&records)?;
        }
        Ok(())
    }

    /// Store a firmware image and register it in the catalog.
    ///
    /// `version` falls back to inference from `original_filename`.
    pub fn add(
        &self,
        filename: &str,
        content: &[u8],
        original_filename: &str,
        version: Option<&str>,
        target_device: &str,
        metadata: Map<String, Value>,
    ) -> Result<FirmwareRecord, ServiceError> {
        self.store
            .put(filename, content)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let version = match version {
            Some(v) => v.to_string(),
            None => extract_version_from_filename(original_filename),
        };

        let record = FirmwareRecord {
            id: format!("fw_{}_{}", unix_now(), file_stem(filename)),
            filename: filename.to_string(),
            original_filename: original_filename.to_string(),
            version,
            size: content.len() as u64,
            checksum: checksum::calculate(content, HashAlgorithm::Md5),
            upload_time: now_rfc3339(),
            target_device: target_device.to_string(),
            is_encrypted: false,
            encryption_algorithm: EncryptionAlgorithm::None,
            encryption_metadata: Map::new(),
            metadata,
        };

        let mut records = self.records();
        records.insert(record.id.clone(), record.clone());
        self.persist(&records)?;

        info!("added firmware {} -> {}", original_filename, record.id);
        Ok(record)
    }

    /// Delete a firmware file and its record. Returns `false` if the
    /// id is unknown; deleting an already-missing file is not an
    /// error.
    pub fn remove(&self, id: &str) -> bool {
        let mut records = self.records();
        let Some(record) = records.get(id) else {
            return false;
        };

        if let Err(e) = self.store.delete(&record.filename) {
            error!("failed to delete firmware file {}: {}", record.filename, e);
            return false;
        }

        records.remove(id);
        if let Err(e) = self.persist(&records) {
            warn!("failed to persist sidecar after remove: {}", e);
        }

        info!("removed firmware {}", id);
        true
    }

    pub fn get(&self, id: &str) -> Option<FirmwareRecord> {
        self.records().get(id).cloned()
    }

    /// Look up by stored or original file name.
    pub fn get_by_filename(&self, filename: &str) -> Option<FirmwareRecord> {
        self.records()
            .values()
            .find(|r| r.filename == filename || r.original_filename == filename)
            .cloned()
    }

    /// List records, newest version first, upload time breaking ties.
    /// Unparseable versions sort last.
    pub fn list(
        &self,
        target_device: Option<&str>,
        encrypted_only: Option<bool>,
    ) -> Vec<FirmwareRecord> {
        let records = self.records();
        let mut items: Vec<FirmwareRecord> = records
            .values()
            .filter(|r| target_device.is_none_or(|d| r.target_device == d))
            .filter(|r| encrypted_only.is_none_or(|e| r.is_encrypted == e))
            .cloned()
            .collect();

        items.sort_by(|a, b| b.ordering_key().cmp(&a.ordering_key()));
        items
    }

    /// The newest record for `target_device` (or overall).
    pub fn latest(&self, target_device: Option<&str>) -> Option<FirmwareRecord> {
        self.list(target_device, None).into_iter().next()
    }

    /// Find a record by exact version (leading `v` tolerated on the
    /// query), optionally restricted to a target device.
    pub fn get_by_version(
        &self,
        version: &str,
        target_device: Option<&str>,
    ) -> Option<FirmwareRecord> {
        let wanted = FirmwareVersion::parse(version);
        if wanted == FirmwareVersion::default() {
            return None;
        }
        self.list(target_device, None)
            .into_iter()
            .find(|r| FirmwareVersion::parse(&r.version) == wanted)
    }

    /// Read the current on-disk content of a record's backing file.
    pub fn read_content(&self, id: &str) -> Result<Vec<u8>, ServiceError> {
        let filename = self
            .records()
            .get(id)
            .map(|r| r.filename.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("firmware '{}' not found", id)))?;

        self.store
            .get(&filename)
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("firmware file missing: {}", filename)))
    }

    /// Encrypt a stored image in place.
    ///
    /// Already-encrypted records are a successful no-op — there is no
    /// re-encryption or algorithm change. On success the backing file
    /// holds the cipher output, the record carries the merged
    /// encryption metadata (including the password, or the raw key as
    /// hex, for downstream device delivery) and fresh size/checksum.
    /// Any failure returns `false` with the record untouched.
    pub fn encrypt_in_place(
        &self,
        id: &str,
        algorithm: EncryptionAlgorithm,
        password: Option<&str>,
        key: Option<&[u8]>,
    ) -> bool {
        let mut records = self.records();
        let Some(record) = records.get_mut(id) else {
            error!("cannot encrypt unknown firmware {}", id);
            return false;
        };

        if record.is_encrypted {
            info!("firmware {} already encrypted, skipping", id);
            return true;
        }

        let content = match self.store.get(&record.filename) {
            Ok(Some(content)) => content,
            Ok(None) => {
                error!("firmware file missing: {}", record.filename);
                return false;
            }
            Err(e) => {
                error!("failed to read firmware {}: {}", id, e);
                return false;
            }
        };

        let version = record.version.clone();
        let (output, metadata) =
            match self
                .engine
                .encrypt(&content, algorithm, key, password, Some(&version))
            {
                Ok(result) => result,
                Err(e) => {
                    error!("firmware encryption failed for {}: {}", id, e);
                    return false;
                }
            };

        if let Err(e) = self.store.put(&record.filename, &output) {
            error!("failed to write encrypted firmware {}: {}", id, e);
            return false;
        }

        record.is_encrypted = true;
        record.encryption_algorithm = algorithm;
        for (k, v) in metadata {
            record.encryption_metadata.insert(k, v);
        }

        // The bootloader re-derives the key from this password at
        // flash time; a manually supplied key travels the same channel
        // as its hex encoding.
        if let Some(pw) = password {
            record.encryption_metadata.insert("password".into(), json!(pw));
        } else if let Some(k) = key {
            record
                .encryption_metadata
                .insert("password".into(), json!(hex::encode(k)));
        }

        record.size = output.len() as u64;
        record.checksum = checksum::calculate(&output, HashAlgorithm::Md5);

        if let Err(e) = self.persist(&records) {
            warn!("failed to persist sidecar after encrypt: {}", e);
        }

        info!("encrypted firmware {} ({})", id, algorithm);
        true
    }

    /// Aggregate counters over the catalog.
    pub fn storage_info(&self) -> StorageInfo {
        let records = self.records();
        StorageInfo {
            firmware_count: records.len(),
            total_firmware_size: records.values().map(|r| r.size).sum(),
        }
    }

    /// Version summary with `is_latest` flags, newest first.
    pub fn version_listing(&self, target_device: Option<&str>) -> VersionListing {
        let items = self.list(target_device, None);
        let latest_id = items.first().map(|r| r.id.clone());

        let versions: Vec<VersionInfo> = items
            .iter()
            .map(|r| VersionInfo {
                version: r.version.clone(),
                id: r.id.clone(),
                filename: r.original_filename.clone(),
                size: r.size,
                upload_time: r.upload_time.clone(),
                is_encrypted: r.is_encrypted,
                is_latest: latest_id.as_deref() == Some(r.id.as_str()),
            })
            .collect();

        VersionListing {
            count: versions.len(),
            latest_version: items.first().map(|r| r.version.clone()),
            versions,
        }
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, FirmwareRecord>> {
        // Recover the map from a poisoned lock; records are always
        // left internally consistent between mutations.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, records: &HashMap<String, FirmwareRecord>) -> Result<(), ServiceError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.store
            .put(SIDECAR_FILE, &json)
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }
}

fn file_stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_strips_last_extension() {
        assert_eq!(file_stem("boot_v1.2.3.45.bin"), "boot_v1.2.3.45");
        assert_eq!(file_stem("noext"), "noext");
    }
}
