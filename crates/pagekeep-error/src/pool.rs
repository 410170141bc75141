// Worker pool error types

use thiserror::Error;
use crate::{ErrorCode, ErrorDomain, PageKeepError};

/// Pool error codes
pub mod codes {
    use crate::ErrorCode;

    // Pool error codes start with 6000
    pub const EMPTY_POOL: ErrorCode = ErrorCode(6001);
}

/// Errors raised by the worker pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool needs at least one resource to hand out
    #[error("A worker pool needs at least one resource")]
    EmptyPool,
}

impl PageKeepError for PoolError {
    fn code(&self) -> ErrorCode {
        match self {
            PoolError::EmptyPool => codes::EMPTY_POOL,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Pool
    }
}

/// Convenient Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

impl From<PoolError> for Box<dyn PageKeepError> {
    fn from(err: PoolError) -> Self {
        Box::new(err)
    }
}
