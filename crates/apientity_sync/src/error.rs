//! Error types for sync operations.

use apientity_core::CoreError;
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse error kind surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorCode {
    /// Local validation failed; no request was sent.
    ValidationFailure,
    /// The request failed in transport or on the server.
    SyncFailure,
}

impl fmt::Display for SyncErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorCode::ValidationFailure => write!(f, "ValidationFailure"),
            SyncErrorCode::SyncFailure => write!(f, "SyncFailure"),
        }
    }
}

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The entity failed validation before any request was made.
    #[error("validation failed: {}", .errors.join("; "))]
    ValidationFailure {
        /// Validation messages, never empty.
        errors: Vec<String>,
    },

    /// The server answered with a non-success status.
    #[error("server responded with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: Option<String>,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Timeout.
    #[error("request timed out")]
    Timeout,

    /// Destroy was called on an entity the server has never seen.
    #[error("{resource} was never sent to the server and cannot be destroyed")]
    NotPersisted {
        /// Resource name.
        resource: &'static str,
    },

    /// No process-wide configuration was installed.
    #[error("no sync configuration installed")]
    NotConfigured,

    /// The response could not be applied to the entity.
    #[error("invalid response: {0}")]
    Core(#[from] CoreError),
}

impl SyncError {
    /// Error domain reported to callers.
    pub const DOMAIN: &'static str = "EntitySync";

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> SyncErrorCode {
        match self {
            SyncError::ValidationFailure { .. } => SyncErrorCode::ValidationFailure,
            _ => SyncErrorCode::SyncFailure,
        }
    }

    /// Returns the human-readable message, if any.
    ///
    /// For server errors this is whatever the response body carried.
    pub fn message(&self) -> Option<String> {
        match self {
            SyncError::Server { message, .. } => message.clone(),
            SyncError::ValidationFailure { errors } => Some(errors.join("; ")),
            SyncError::Transport { message, .. } => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Returns true if a caller may reasonably retry.
    ///
    /// Informational only; nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        let err = SyncError::ValidationFailure {
            errors: vec!["name can't be blank".into()],
        };
        assert_eq!(err.code(), SyncErrorCode::ValidationFailure);
        assert_eq!(err.message().as_deref(), Some("name can't be blank"));

        assert_eq!(SyncError::Timeout.code(), SyncErrorCode::SyncFailure);
        assert_eq!(
            SyncError::NotPersisted { resource: "widget" }.code(),
            SyncErrorCode::SyncFailure
        );
        assert_eq!(SyncError::DOMAIN, "EntitySync");
    }

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("bad url").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::Server { status: 503, message: None }.is_retryable());
        assert!(!SyncError::Server { status: 422, message: None }.is_retryable());
        assert!(!SyncError::NotConfigured.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::Server {
            status: 404,
            message: Some("not found".into()),
        };
        assert_eq!(err.to_string(), "server responded with status 404: not found");
        assert_eq!(err.message().as_deref(), Some("not found"));

        let err = SyncError::Server {
            status: 500,
            message: None,
        };
        assert!(err.message().is_none());
        assert!(err.to_string().contains("no message"));
    }

    #[test]
    fn core_errors_convert() {
        let err: SyncError = CoreError::invalid_format("expected object").into();
        assert!(matches!(err, SyncError::Core(_)));
        assert_eq!(err.code(), SyncErrorCode::SyncFailure);
    }
}
