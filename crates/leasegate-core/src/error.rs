//! Shared error type across leasegate crates.

use thiserror::Error;

/// Stable error codes surfaced to the leasing API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A filter explicitly rejected the lease operation.
    PolicyDenied,
    /// A filter could not render a decision (transport failure, timeout).
    PolicyUnavailable,
    /// Enforcement could not be configured.
    Configuration,
    /// Context or lease snapshot violates model invariants.
    InvalidRequest,
    /// Internal fault.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::PolicyDenied => "POLICY_DENIED",
            ErrorCode::PolicyUnavailable => "POLICY_UNAVAILABLE",
            ErrorCode::Configuration => "CONFIGURATION",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, LeaseGateError>;

/// Unified error type used by core and enforcement.
#[derive(Debug, Error)]
pub enum LeaseGateError {
    #[error("policy denied by {filter}: {reason}")]
    PolicyDenied { filter: String, reason: String },
    #[error("policy unavailable ({filter}): {reason}")]
    PolicyUnavailable { filter: String, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LeaseGateError {
    /// Map internal error to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            LeaseGateError::PolicyDenied { .. } => ErrorCode::PolicyDenied,
            LeaseGateError::PolicyUnavailable { .. } => ErrorCode::PolicyUnavailable,
            LeaseGateError::Configuration(_) => ErrorCode::Configuration,
            LeaseGateError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            LeaseGateError::Internal(_) => ErrorCode::Internal,
        }
    }
}
