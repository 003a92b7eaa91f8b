pub mod catalog;
pub mod model;
pub mod version;

pub use catalog::{FirmwareCatalog, SIDECAR_FILE, StorageInfo, VersionInfo, VersionListing};
pub use model::FirmwareRecord;
pub use version::FirmwareVersion;
