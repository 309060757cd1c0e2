//! Error taxonomy for the guardrail engine.
//!
//! All fallible operations return `GuardResult<T>`. Every variant maps to a
//! stable [`ErrorKind`] tag that the workflow runner uses to decide whether a
//! failure is retryable and that audit metadata carries verbatim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The unified error type for the guardrail engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    /// The actor holds no role granting the requested permission, or the
    /// actor is unknown or inactive.
    #[error("actor '{actor}' lacks permission '{permission}' for operation '{operation}'")]
    Unauthorized {
        actor: String,
        permission: String,
        operation: String,
    },

    /// A command or text payload matched a forbidden pattern.
    #[error("security violation: {reason}")]
    SecurityViolation { reason: String },

    /// Malformed or out-of-range input. Retrying cannot succeed.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The actor exhausted the request budget for an action class.
    #[error("rate limit exceeded for '{action_class}'")]
    RateLimited { action_class: String },

    /// Network, model or timeout failure that may succeed on retry.
    #[error("transient failure: {reason}")]
    Transient { reason: String },

    /// A configuration or programming error. Never retried.
    #[error("fatal error: {reason}")]
    Fatal { reason: String },
}

impl GuardError {
    pub fn security(reason: impl Into<String>) -> Self {
        Self::SecurityViolation { reason: reason.into() }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal { reason: reason.into() }
    }

    /// The stable tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::Unauthorized { .. } => ErrorKind::Unauthorized,
            GuardError::SecurityViolation { .. } => ErrorKind::SecurityViolation,
            GuardError::Validation { .. } => ErrorKind::ValidationError,
            GuardError::RateLimited { .. } => ErrorKind::RateLimited,
            GuardError::Transient { .. } => ErrorKind::TransientFailure,
            GuardError::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Serializable discriminant of [`GuardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    SecurityViolation,
    ValidationError,
    RateLimited,
    TransientFailure,
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::SecurityViolation => "security_violation",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::TransientFailure => "transient_failure",
            ErrorKind::Fatal => "fatal",
        }
    }

    /// Only transient failures are eligible for retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransientFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience alias used throughout the Warden crates.
pub type GuardResult<T> = Result<T, GuardError>;
