// Page settings
//
// Versioning options applied to newly constructed pages.

use serde::{Deserialize, Serialize};

use pagekeep_error::{ConfigError, ConfigResult};

use crate::version::DEFAULT_MAX_VERSIONS;

/// Versioning settings for pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    /// Number of change lists retained per page
    pub max_versions: usize,

    /// Whether new pages record changes
    pub versioned_by_default: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            max_versions: DEFAULT_MAX_VERSIONS,
            versioned_by_default: true,
        }
    }
}

impl PageSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of retained versions
    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions;
        self
    }

    /// Enable or disable versioning of new pages
    pub fn with_versioned_by_default(mut self, versioned: bool) -> Self {
        self.versioned_by_default = versioned;
        self
    }

    /// Parse settings from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
