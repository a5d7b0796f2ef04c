//! Configuration for the device store

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::InitError;

/// Configuration for a [`DeviceStore`](crate::DeviceStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceStoreConfig {
    /// Directory holding the database file
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub file_name: String,
    /// redb page cache size in bytes
    pub cache_size: usize,
}

impl Default for DeviceStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            file_name: "devices.redb".to_string(),
            cache_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

impl DeviceStoreConfig {
    /// Create a configuration with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the database file name
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Set the page cache size
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Full path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    /// Parse a configuration from TOML
    ///
    /// Missing fields take their default values.
    pub fn from_toml_str(input: &str) -> Result<Self, InitError> {
        toml::from_str(input).map_err(|e| InitError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceStoreConfig::default();
        assert_eq!(config.db_path(), PathBuf::from("./data/devices.redb"));
        assert_eq!(config.cache_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_builders() {
        let config = DeviceStoreConfig::with_data_dir("/var/lib/chime")
            .with_file_name("chime.redb")
            .with_cache_size(1024);
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/chime/chime.redb"));
        assert_eq!(config.cache_size, 1024);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = DeviceStoreConfig::from_toml_str(r#"data_dir = "/srv/chime""#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/chime"));
        assert_eq!(config.file_name, "devices.redb");
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = DeviceStoreConfig::from_toml_str("cache_size = \"big\"").unwrap_err();
        assert!(matches!(err, InitError::Config(_)));
    }
}
