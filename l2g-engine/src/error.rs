//! Typed failures of engine operations

use l2g_core::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Bad or unknown parent id; `status` is 400 or 404
    #[error("{message}")]
    InvalidProduct { message: String, status: u16 },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AttributeMissing(String),

    /// `conflict` is set when the store reported a naming conflict
    #[error("{message}")]
    TermsMissing { message: String, conflict: bool },

    #[error("{0}")]
    TermAssignment(String),

    #[error("{message}")]
    ApplyFailed { message: String, details: String },
}

impl MappingError {
    pub fn apply_failed(details: impl Into<String>) -> Self {
        MappingError::ApplyFailed {
            message: "Failed to apply attribute mapping".to_string(),
            details: details.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MappingError::InvalidProduct { .. } => ErrorCode::InvalidProduct,
            MappingError::Validation(_) => ErrorCode::Validation,
            MappingError::AttributeMissing(_) => ErrorCode::AttributeMissing,
            MappingError::TermsMissing { .. } => ErrorCode::TermsMissing,
            MappingError::TermAssignment(_) => ErrorCode::TermAssignment,
            MappingError::ApplyFailed { .. } => ErrorCode::ApplyFailed,
        }
    }

    /// HTTP-equivalent status
    pub fn status(&self) -> u16 {
        match self {
            MappingError::InvalidProduct { status, .. } => *status,
            MappingError::Validation(_) | MappingError::AttributeMissing(_) => 400,
            MappingError::TermsMissing { conflict: true, .. } => 409,
            MappingError::TermsMissing { .. } => 400,
            MappingError::TermAssignment(_) | MappingError::ApplyFailed { .. } => 500,
        }
    }

    pub fn into_api(self, corr_id: &str) -> ApiError {
        let code = self.code();
        let status = self.status();
        match self {
            MappingError::ApplyFailed { message, details } => {
                ApiError::new(code, status, message, corr_id).with_details(details)
            }
            other => ApiError::new(code, status, other.to_string(), corr_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let invalid = MappingError::InvalidProduct {
            message: "Product not found".to_string(),
            status: 404,
        };
        assert_eq!(invalid.status(), 404);
        assert_eq!(invalid.code(), ErrorCode::InvalidProduct);

        assert_eq!(MappingError::Validation("x".to_string()).status(), 400);
        assert_eq!(MappingError::AttributeMissing("x".to_string()).status(), 400);
        assert_eq!(
            MappingError::TermsMissing { message: "x".to_string(), conflict: false }.status(),
            400
        );
        assert_eq!(
            MappingError::TermsMissing { message: "x".to_string(), conflict: true }.status(),
            409
        );
        assert_eq!(MappingError::TermAssignment("x".to_string()).status(), 500);
        assert_eq!(MappingError::apply_failed("x").status(), 500);
    }

    #[test]
    fn test_into_api_carries_details() {
        let api = MappingError::apply_failed("variation failure").into_api("l2g_1");
        assert_eq!(api.code, ErrorCode::ApplyFailed);
        assert_eq!(api.status, 500);
        assert_eq!(api.corr_id, "l2g_1");
        assert_eq!(api.details.as_deref(), Some("variation failure"));

        let api = MappingError::Validation("Mapping is empty".to_string()).into_api("l2g_2");
        assert_eq!(api.message, "Mapping is empty");
        assert!(api.details.is_none());
    }
}
