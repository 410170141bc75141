// Page manager error types

use thiserror::Error;
use crate::{ErrorCode, ErrorDomain, PageKeepError, StoreError, TreeError};

/// Manager error codes
pub mod codes {
    use crate::ErrorCode;

    // Manager error codes start with 4000
    pub const PAGE_EXPIRED: ErrorCode = ErrorCode(4001);
    pub const SESSION_DESTROYED: ErrorCode = ErrorCode(4002);
    pub const STORE: ErrorCode = ErrorCode(4003);
    pub const TREE: ErrorCode = ErrorCode(4004);
}

/// Errors surfaced by the page manager to request handling code
#[derive(Error, Debug, Clone)]
pub enum ManagerError {
    /// The requested page or page version is no longer retained
    #[error("Page {page_id} version {version:?} has expired, please retry")]
    PageExpired { page_id: u32, version: Option<u32> },

    /// The session was destroyed while a request still referenced it
    #[error("Session '{0}' has been destroyed")]
    SessionDestroyed(String),

    /// The store pipeline failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The page tree rejected an operation
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ManagerError {
    /// Whether this error should be shown to the user as an expired page
    pub fn is_expired(&self) -> bool {
        matches!(self, ManagerError::PageExpired { .. })
    }
}

impl PageKeepError for ManagerError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            ManagerError::PageExpired { .. } => PAGE_EXPIRED,
            ManagerError::SessionDestroyed(_) => SESSION_DESTROYED,
            ManagerError::Store(_) => STORE,
            ManagerError::Tree(_) => TREE,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Manager
    }
}

/// Convenient Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<ManagerError> for Box<dyn PageKeepError> {
    fn from(err: ManagerError) -> Self {
        Box::new(err)
    }
}
