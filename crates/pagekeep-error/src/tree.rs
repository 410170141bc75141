// Component tree error types
// Raised by the page, traversal and version code in pagekeep-core

use thiserror::Error;
use crate::{ErrorCode, ErrorDomain, PageKeepError};

/// Tree error codes
pub mod codes {
    use crate::ErrorCode;

    // Tree error codes start with 1000
    pub const COMPONENT_NOT_FOUND: ErrorCode = ErrorCode(1001);
    pub const DUPLICATE_CHILD: ErrorCode = ErrorCode(1002);
    pub const ROOT_NOT_REMOVABLE: ErrorCode = ErrorCode(1003);
    pub const INVALID_PATH: ErrorCode = ErrorCode(1004);
    pub const RECORDING_STATE: ErrorCode = ErrorCode(1005);
}

/// Errors raised while mutating or querying a component tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No component with this id is attached to the page
    #[error("Component not found: {0}")]
    ComponentNotFound(u64),

    /// A sibling with the same id already exists
    #[error("Component '{id}' already exists under component {parent}")]
    DuplicateChild { parent: u64, id: String },

    /// The page root can not be removed from its own tree
    #[error("The page root can not be removed")]
    RootNotRemovable,

    /// A path did not resolve to a component
    #[error("Invalid component path: '{0}'")]
    InvalidPath(String),

    /// begin/end version called out of order
    #[error("Version recording error: {0}")]
    RecordingState(String),
}

impl PageKeepError for TreeError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            TreeError::ComponentNotFound(_) => COMPONENT_NOT_FOUND,
            TreeError::DuplicateChild { .. } => DUPLICATE_CHILD,
            TreeError::RootNotRemovable => ROOT_NOT_REMOVABLE,
            TreeError::InvalidPath(_) => INVALID_PATH,
            TreeError::RecordingState(_) => RECORDING_STATE,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Tree
    }
}

/// Convenient Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Convert from tree error to boxed error
impl From<TreeError> for Box<dyn PageKeepError> {
    fn from(err: TreeError) -> Self {
        Box::new(err)
    }
}
