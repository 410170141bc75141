// Configuration for the page manager

use serde::{Deserialize, Serialize};

use pagekeep_core::PageSettings;
use pagekeep_error::{ConfigError, ConfigResult};
use pagekeep_store::StoreSettings;

/// Settings of the page manager: page versioning and the store pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub page: PageSettings,
    pub store: StoreSettings,
}

impl ManagerSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page settings
    pub fn with_page_settings(mut self, page: PageSettings) -> Self {
        self.page = page;
        self
    }

    /// Set the store settings
    pub fn with_store_settings(mut self, store: StoreSettings) -> Self {
        self.store = store;
        self
    }

    /// Parse `[page]` and `[store]` tables from a TOML document
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.store.validate()?;
        Ok(settings)
    }
}
