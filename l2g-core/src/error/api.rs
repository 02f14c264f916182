//! Caller-facing error object returned by the mapping service

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable error codes surfaced to adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "l2g_invalid_product")]
    InvalidProduct,
    #[serde(rename = "l2g_validation")]
    Validation,
    #[serde(rename = "l2g_attribute_missing")]
    AttributeMissing,
    #[serde(rename = "l2g_terms_missing")]
    TermsMissing,
    #[serde(rename = "l2g_term_assignment")]
    TermAssignment,
    #[serde(rename = "l2g_apply_failed")]
    ApplyFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidProduct => "l2g_invalid_product",
            ErrorCode::Validation => "l2g_validation",
            ErrorCode::AttributeMissing => "l2g_attribute_missing",
            ErrorCode::TermsMissing => "l2g_terms_missing",
            ErrorCode::TermAssignment => "l2g_term_assignment",
            ErrorCode::ApplyFailed => "l2g_apply_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every public engine operation.
///
/// Carries everything an operator needs to trace the failure: the code, an
/// HTTP-equivalent status, a human message and the correlation id under which
/// the operation logged its events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    pub corr_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>, corr_id: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
            corr_id: corr_id.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Client-side failures (4xx) are never worth retrying unchanged
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}
