// Configuration for the page store pipeline

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pagekeep_error::{ConfigError, ConfigResult};

/// Settings used to assemble the store pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Prefix of the file store folder and of every page file
    pub application_name: String,

    /// Folder under which the file store keeps its data
    pub file_store_folder: PathBuf,

    /// Bytes kept on disk per session before the oldest files are dropped
    pub max_size_per_session: u64,

    /// Live pages cached per session
    pub in_session_cache_size: usize,

    /// Pending writes before callers write synchronously
    pub async_queue_capacity: usize,

    /// Whether writes go through the background writer
    pub asynchronous: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            application_name: "pagekeep".to_string(),
            file_store_folder: std::env::temp_dir(),
            max_size_per_session: 10 * 1024 * 1024, // 10 MiB
            in_session_cache_size: 40,
            async_queue_capacity: 100,
            asynchronous: true,
        }
    }
}

impl StoreSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the folder of the file store
    pub fn with_file_store_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.file_store_folder = folder.into();
        self
    }

    /// Set the disk budget per session
    pub fn with_max_size_per_session(mut self, bytes: u64) -> Self {
        self.max_size_per_session = bytes;
        self
    }

    /// Set the number of live pages cached per session
    pub fn with_in_session_cache_size(mut self, pages: usize) -> Self {
        self.in_session_cache_size = pages;
        self
    }

    /// Set the capacity of the write-behind queue
    pub fn with_async_queue_capacity(mut self, capacity: usize) -> Self {
        self.async_queue_capacity = capacity;
        self
    }

    /// Enable or disable the background writer
    pub fn with_asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Parse settings from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.application_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "application_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_size_per_session == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_size_per_session".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.in_session_cache_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "in_session_cache_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.asynchronous && self.async_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "async_queue_capacity".to_string(),
                reason: "must be positive when asynchronous".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let settings = StoreSettings::default();
        assert_eq!(settings.application_name, "pagekeep");
        assert_eq!(settings.max_size_per_session, 10 * 1024 * 1024);
        assert_eq!(settings.in_session_cache_size, 40);
        assert_eq!(settings.async_queue_capacity, 100);
        assert!(settings.asynchronous);
    }

    #[test]
    fn test_config_builder() {
        let settings = StoreSettings::new()
            .with_application_name("shop")
            .with_file_store_folder("/var/tmp")
            .with_max_size_per_session(1024)
            .with_in_session_cache_size(2)
            .with_async_queue_capacity(8)
            .with_asynchronous(false);
        assert_eq!(settings.application_name, "shop");
        assert_eq!(settings.file_store_folder, PathBuf::from("/var/tmp"));
        assert_eq!(settings.max_size_per_session, 1024);
        assert_eq!(settings.in_session_cache_size, 2);
        assert_eq!(settings.async_queue_capacity, 8);
        assert!(!settings.asynchronous);
    }

    #[test]
    fn test_toml_parsing() {
        let settings = StoreSettings::from_toml_str(
            "application_name = \"shop\"\nin_session_cache_size = 3\n",
        )
        .unwrap();
        assert_eq!(settings.application_name, "shop");
        assert_eq!(settings.in_session_cache_size, 3);
        assert_eq!(settings.async_queue_capacity, 100);

        let err = StoreSettings::from_toml_str("async_queue_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        for (key, document) in [
            ("max_size_per_session", "max_size_per_session = 0"),
            ("in_session_cache_size", "in_session_cache_size = 0"),
        ] {
            match StoreSettings::from_toml_str(document) {
                Err(ConfigError::InvalidValue { key: rejected, .. }) => assert_eq!(rejected, key),
                other => panic!("{} = 0 was accepted: {:?}", key, other),
            }
        }
        assert!(StoreSettings::new().with_in_session_cache_size(0).validate().is_err());
        assert!(StoreSettings::new().with_asynchronous(false).with_async_queue_capacity(0).validate().is_ok());
    }
}
