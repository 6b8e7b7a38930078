//! Error types for entity parsing and collection membership.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while parsing or mutating entities.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The wire value did not have the expected shape.
    #[error("invalid wire format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A mapped payload could not be applied to the resource fields.
    #[error("cannot map payload onto {resource}: {source}")]
    FieldMapping {
        /// Resource name.
        resource: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// An operation needed an identifier the entity does not have.
    #[error("{resource} has no identifier")]
    MissingIdentifier {
        /// Resource name.
        resource: &'static str,
    },

    /// The object is not a member of the collection.
    #[error("object is not a member of collection {path}")]
    NotAMember {
        /// Path of the collection.
        path: String,
    },
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a field mapping error.
    pub fn field_mapping(resource: &'static str, source: serde_json::Error) -> Self {
        Self::FieldMapping { resource, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::invalid_format("expected object");
        assert_eq!(err.to_string(), "invalid wire format: expected object");

        let err = CoreError::MissingIdentifier { resource: "widget" };
        assert_eq!(err.to_string(), "widget has no identifier");
    }

    #[test]
    fn field_mapping_keeps_source() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = CoreError::field_mapping("widget", source);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("cannot map payload onto widget"));
    }
}
