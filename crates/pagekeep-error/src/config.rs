// Configuration error types

use thiserror::Error;
use crate::{ErrorCode, ErrorDomain, PageKeepError};

/// Config error codes
pub mod codes {
    use crate::ErrorCode;

    // Config error codes start with 7000
    pub const PARSE_FAILED: ErrorCode = ErrorCode(7001);
    pub const INVALID_VALUE: ErrorCode = ErrorCode(7002);
}

/// Errors raised while loading settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The settings document could not be parsed
    #[error("Could not parse settings: {0}")]
    Parse(String),

    /// A setting holds a value outside its allowed range
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl PageKeepError for ConfigError {
    fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Parse(_) => codes::PARSE_FAILED,
            ConfigError::InvalidValue { .. } => codes::INVALID_VALUE,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Config
    }
}

/// Convenient Result type for settings operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for Box<dyn PageKeepError> {
    fn from(err: ConfigError) -> Self {
        Box::new(err)
    }
}
