use crate::error::BlobError;

/// Metadata for a stored blob.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    pub name: String,
    pub size: u64,
}

/// BlobStore provides flat binary storage for firmware images and
/// their catalog sidecar.
///
/// Names are bare file names: `boot_v1.2.3.45.bin`, `metadata.json`.
/// The default implementation (`FileStore`) maps names to files in a
/// single local directory. Can be swapped for S3/OSS backends by
/// implementing this trait.
pub trait BlobStore: Send + Sync {
    /// Store a blob. Overwrites if the name already exists.
    fn put(&self, name: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Retrieve a blob's full content. Returns None if it does not exist.
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Delete a blob. No-op if the name does not exist.
    fn delete(&self, name: &str) -> Result<(), BlobError>;

    /// Check whether a blob exists.
    fn exists(&self, name: &str) -> Result<bool, BlobError>;

    /// List blobs whose name ends with `suffix` (empty suffix lists
    /// everything). Returns metadata sorted by name.
    fn list(&self, suffix: &str) -> Result<Vec<BlobMeta>, BlobError>;
}
