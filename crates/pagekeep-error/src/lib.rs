// Pagekeep Error Handling Framework
// Central location for error types, traits, and handling utilities

use std::error::Error as StdError;
use std::fmt;

// Re-export common error handling tools for convenience
pub use thiserror;
pub use tracing;

mod macros;

mod config;
mod manager;
mod pool;
mod serialization;
mod store;
mod tree;

// Public exports (Consolidated)
pub use config::{ConfigError, ConfigResult};
pub use manager::{ManagerError, ManagerResult};
pub use pool::{PoolError, PoolResult};
pub use serialization::{SerializationError, SerializationResult};
pub use store::{StoreError, StoreResult};
pub use tree::{TreeError, TreeResult};

/// Error domains representing different components of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorDomain {
    Config, Tree, Serialization, Store, Manager, Pool,
}
impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Config => write!(f, "config"),
            ErrorDomain::Tree => write!(f, "tree"),
            ErrorDomain::Serialization => write!(f, "serialization"),
            ErrorDomain::Store => write!(f, "store"),
            ErrorDomain::Manager => write!(f, "manager"),
            ErrorDomain::Pool => write!(f, "pool"),
        }
    }
}

/// Error code structure for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ErrorCode(pub u32);
impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Base trait for all errors raised by the pagekeep crates.
pub trait PageKeepError: StdError + Send + Sync + 'static {
    /// Returns the numeric code for this error.
    fn code(&self) -> ErrorCode;

    /// Returns the domain this error belongs to.
    fn domain(&self) -> ErrorDomain;

    /// Indicates if the error is temporary and retrying might succeed.
    fn is_transient(&self) -> bool { false }

    /// Renders the error as `<domain>-<code>: <message>`.
    fn describe(&self) -> String {
        format!("{}-{}: {}", self.domain(), self.code(), self)
    }
}

/// Shorthand for a boxed PageKeepError
pub type BoxError = Box<dyn PageKeepError>;
/// Standard Result type using BoxError
pub type Result<T> = std::result::Result<T, BoxError>;
