//! Workspace-wide error type plus the caller-facing [`ApiError`]

pub mod api;

use thiserror::Error;
pub use api::{ApiError, ErrorCode};

/// Failures outside the mapping flow itself: files, config, catalog I/O
#[derive(Error, Debug)]
pub enum L2gError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Catalog store failure: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    Other(String),
}

pub type L2gResult<T> = Result<T, L2gError>;

impl From<serde_json::Error> for L2gError {
    fn from(err: serde_json::Error) -> Self {
        L2gError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for L2gError {
    fn from(err: toml::de::Error) -> Self {
        L2gError::Configuration(format!("Failed to parse config: {}", err))
    }
}

impl From<toml::ser::Error> for L2gError {
    fn from(err: toml::ser::Error) -> Self {
        L2gError::Configuration(format!("Failed to serialize config: {}", err))
    }
}

impl From<anyhow::Error> for L2gError {
    fn from(err: anyhow::Error) -> Self {
        L2gError::Other(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_messages_name_the_subject() {
        assert_eq!(
            L2gError::NotFound("Catalog catalog.json".to_string()).to_string(),
            "Catalog catalog.json not found"
        );
        assert_eq!(
            L2gError::AlreadyExists("Taxonomy pa_cor".to_string()).to_string(),
            "Taxonomy pa_cor already exists"
        );
        assert_eq!(
            L2gError::Configuration("prefix cannot be empty".to_string()).to_string(),
            "Invalid configuration: prefix cannot be empty"
        );
    }

    #[test]
    fn test_io_kind_is_preserved() {
        let err: L2gError = io::Error::new(io::ErrorKind::PermissionDenied, "catalog.json").into();
        assert!(matches!(err, L2gError::Io(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
        assert!(err.to_string().starts_with("I/O failure"));
    }

    #[test]
    fn test_bad_snapshot_json() {
        let parsed: Result<serde_json::Value, serde_json::Error> = serde_json::from_str("{\"parents\": [}");
        let err: L2gError = parsed.unwrap_err().into();
        assert!(matches!(err, L2gError::Serialization(_)));
    }

    #[test]
    fn test_bad_config_toml() {
        let parsed: Result<toml::Value, toml::de::Error> = toml::from_str("[matching");
        let err: L2gError = parsed.unwrap_err().into();
        assert!(matches!(err, L2gError::Configuration(ref m) if m.starts_with("Failed to parse config")));
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        let err: L2gError = anyhow::anyhow!("disk full").context("saving catalog").into();
        assert_eq!(err.to_string(), "saving catalog: disk full");
    }
}
