//! Errors reported by catalog stores

use l2g_core::L2gError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The name or slug is already taken
    #[error("{0}")]
    Conflict(String),

    /// The store refuses the name, value or taxonomy
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// True for naming conflicts, including backends that only report one in
    /// the message text
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Conflict(_) => true,
            other => other.to_string().to_lowercase().contains("already exists"),
        }
    }
}

impl From<StoreError> for L2gError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => L2gError::NotFound(what),
            StoreError::Conflict(msg) => L2gError::AlreadyExists(msg),
            other => L2gError::Storage(other.to_string()),
        }
    }
}

impl From<L2gError> for StoreError {
    fn from(err: L2gError) -> Self {
        StoreError::Backend(err.to_string())
    }
}
