use std::path::PathBuf;

/// Common configuration shared by service binaries.
///
/// Parsed from command-line arguments or environment, then passed to
/// storage and catalog initialization.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root storage directory.
    /// Firmware and sidecar files live under subdirectories of this.
    pub storage_dir: Option<PathBuf>,

    /// Directory holding firmware binaries and the catalog sidecar.
    /// Defaults to `{storage_dir}/firmware` if not specified.
    pub firmware_dir: Option<PathBuf>,

    /// Default target device tag for uploads that don't specify one.
    pub default_target_device: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            firmware_dir: None,
            default_target_device: "STM32F103ZET6".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--storage-dir=PATH`
    /// - `--firmware-dir=PATH`
    /// - `--target-device=TAG`
    pub fn from_args(args: &[String]) -> Self {
        let mut config = ServiceConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--storage-dir=") {
                config.storage_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--firmware-dir=") {
                config.firmware_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--target-device=") {
                config.default_target_device = val.to_string();
            }
        }

        config
    }

    /// Resolve the firmware directory, falling back to `{storage_dir}/firmware`.
    pub fn resolve_firmware_dir(&self) -> PathBuf {
        self.firmware_dir
            .clone()
            .unwrap_or_else(|| self.resolve_storage_subpath("firmware"))
    }

    fn resolve_storage_subpath(&self, name: &str) -> PathBuf {
        self.storage_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let args = vec![
            "--storage-dir=/var/lib/openload".to_string(),
            "--target-device=STM32F407VGT6".to_string(),
        ];
        let config = ServiceConfig::from_args(&args);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/var/lib/openload")));
        assert_eq!(config.default_target_device, "STM32F407VGT6");
    }

    #[test]
    fn test_resolve_defaults() {
        let config = ServiceConfig {
            storage_dir: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_firmware_dir(),
            PathBuf::from("/data/firmware")
        );
    }

    #[test]
    fn test_explicit_firmware_dir_wins() {
        let config = ServiceConfig {
            storage_dir: Some(PathBuf::from("/data")),
            firmware_dir: Some(PathBuf::from("/mnt/fw")),
            ..Default::default()
        };
        assert_eq!(config.resolve_firmware_dir(), PathBuf::from("/mnt/fw"));
    }
}
