// Store pipeline error types
// These errors are raised by the page stores in pagekeep-store

use thiserror::Error;
use crate::{ErrorCode, ErrorDomain, PageKeepError, SerializationError};

/// Store error codes
pub mod codes {
    use crate::ErrorCode;

    // Store error codes start with 3000
    pub const IO_ERROR: ErrorCode = ErrorCode(3001);
    pub const LIVE_PAGE_REJECTED: ErrorCode = ErrorCode(3002);
    pub const SERIALIZATION: ErrorCode = ErrorCode(3003);
    pub const DESTROYED: ErrorCode = ErrorCode(3004);
    pub const SYNC_ERROR: ErrorCode = ErrorCode(3005);
    pub const INVALID_SESSION_ID: ErrorCode = ErrorCode(3006);
}

/// Store-specific error types
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Reading or writing the durable medium failed
    #[error("I/O error for session '{session_id}' page {page_id:?}: {reason}")]
    Io {
        session_id: String,
        page_id: Option<u32>,
        reason: String,
    },

    /// A byte-oriented store was handed a page that was never serialized
    #[error("Store accepts serialized pages only, got live page {page_id}")]
    LivePageRejected { page_id: u32 },

    /// Serialization failed inside the pipeline
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The store was already destroyed
    #[error("Store has been destroyed: {0}")]
    Destroyed(String),

    /// Background writer coordination failed
    #[error("Sync error: {0}")]
    SyncError(String),

    /// The session id can not name a storage location of its own
    #[error("Invalid session id: '{0}'")]
    InvalidSessionId(String),
}

impl StoreError {
    /// Create a new I/O error for a page of a session
    pub fn io(session_id: impl Into<String>, page_id: Option<u32>, err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            session_id: session_id.into(),
            page_id,
            reason: err.to_string(),
        }
    }
}

impl PageKeepError for StoreError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            StoreError::Io { .. } => IO_ERROR,
            StoreError::LivePageRejected { .. } => LIVE_PAGE_REJECTED,
            StoreError::Serialization(_) => SERIALIZATION,
            StoreError::Destroyed(_) => DESTROYED,
            StoreError::SyncError(_) => SYNC_ERROR,
            StoreError::InvalidSessionId(_) => INVALID_SESSION_ID,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Store
    }

    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io { .. })
    }
}

/// Convenient Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for Box<dyn PageKeepError> {
    fn from(err: StoreError) -> Self {
        Box::new(err)
    }
}
