// Serialization error types
// Encoding and decoding failures are kept apart so callers can tell a page
// that could not be written from a blob that could not be read back.

use thiserror::Error;
use crate::{ErrorCode, ErrorDomain, PageKeepError};

/// Serialization error codes
pub mod codes {
    use crate::ErrorCode;

    // Serialization error codes start with 2000
    pub const ENCODE_FAILED: ErrorCode = ErrorCode(2001);
    pub const DECODE_FAILED: ErrorCode = ErrorCode(2002);
}

/// Errors raised by a page serializer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// A live page could not be turned into bytes
    #[error("Could not encode page {page_id}: {reason}")]
    Encode { page_id: u32, reason: String },

    /// A byte blob could not be turned back into a page
    #[error("Could not decode page data ({len} bytes): {reason}")]
    Decode { len: usize, reason: String },
}

impl SerializationError {
    /// Create a new encode error
    pub fn encode(page_id: u32, reason: impl Into<String>) -> Self {
        SerializationError::Encode { page_id, reason: reason.into() }
    }

    /// Create a new decode error
    pub fn decode(len: usize, reason: impl Into<String>) -> Self {
        SerializationError::Decode { len, reason: reason.into() }
    }
}

impl PageKeepError for SerializationError {
    fn code(&self) -> ErrorCode {
        match self {
            SerializationError::Encode { .. } => codes::ENCODE_FAILED,
            SerializationError::Decode { .. } => codes::DECODE_FAILED,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Serialization
    }
}

/// Convenient Result type for serializer operations
pub type SerializationResult<T> = Result<T, SerializationError>;

impl From<SerializationError> for Box<dyn PageKeepError> {
    fn from(err: SerializationError) -> Self {
        Box::new(err)
    }
}
