use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BlobError;
use crate::traits::{BlobMeta, BlobStore};

/// FileStore is a BlobStore implementation backed by one flat local
/// directory.
///
/// Names map directly to files: name "boot_v1.0.0.bin" →
/// `{base_dir}/boot_v1.0.0.bin`. Subdirectories are not part of the
/// namespace; names containing path separators are rejected.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new FileStore rooted at `base_dir`.
    /// The directory is created if it doesn't exist.
    pub fn open(base_dir: &Path) -> Result<Self, BlobError> {
        fs::create_dir_all(base_dir).map_err(|e| BlobError::Io(e.to_string()))?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Directory this store reads and writes.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a name to a filesystem path. Rejects anything that is
    /// not a bare file name.
    fn resolve(&self, name: &str) -> Result<PathBuf, BlobError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == ".."
        {
            return Err(BlobError::Io(format!("invalid blob name: {:?}", name)));
        }
        Ok(self.base_dir.join(name))
    }
}

impl BlobStore for FileStore {
    fn put(&self, name: &str, data: &[u8]) -> Result<(), BlobError> {
        let path = self.resolve(name)?;
        fs::write(&path, data).map_err(|e| BlobError::Io(e.to_string()))?;
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        let data = fs::read(&path).map_err(|e| BlobError::Io(e.to_string()))?;
        Ok(Some(data))
    }

    fn delete(&self, name: &str) -> Result<(), BlobError> {
        let path = self.resolve(name)?;
        if path.is_file() {
            fs::remove_file(&path).map_err(|e| BlobError::Io(e.to_string()))?;
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, BlobError> {
        let path = self.resolve(name)?;
        Ok(path.is_file())
    }

    fn list(&self, suffix: &str) -> Result<Vec<BlobMeta>, BlobError> {
        let mut results = Vec::new();
        let entries =
            fs::read_dir(&self.base_dir).map_err(|e| BlobError::Io(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| BlobError::Io(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(suffix) {
                continue;
            }
            let meta = entry.metadata().map_err(|e| BlobError::Io(e.to_string()))?;
            results.push(BlobMeta {
                name: name.to_string(),
                size: meta.len(),
            });
        }

        results.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("FileStore: listed {} blobs matching {:?}", results.len(), suffix);
        Ok(results)
    }
}
