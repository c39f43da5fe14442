//! Error types for the documentation crate.
//!
//! Registration conflicts only surface when the registry runs with
//! [`ConflictPolicy::Reject`](crate::ConflictPolicy::Reject); the default
//! policy overwrites and logs instead.

use thiserror::Error;

/// Errors that can occur while registering or rendering documentation.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the generated document to JSON.
    #[error("Failed to serialize OpenAPI document: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A schema or operation was registered twice under a rejecting policy.
    #[error("{what} '{key}' is already registered")]
    RegistrationConflict {
        /// What collided: `schema` or `operation`.
        what: &'static str,
        /// The colliding name or `METHOD path` key.
        key: String,
    },

    /// A route path could not be documented.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl DocsError {
    /// Creates a conflict error for a named component schema.
    pub fn schema_conflict(name: impl Into<String>) -> Self {
        Self::RegistrationConflict {
            what: "schema",
            key: name.into(),
        }
    }

    /// Creates a conflict error for an operation.
    pub fn operation_conflict(method: &http::Method, path: &str) -> Self {
        Self::RegistrationConflict {
            what: "operation",
            key: format!("{method} {path}"),
        }
    }
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error() {
        let err: DocsError = serde_json::from_str::<String>("invalid")
            .unwrap_err()
            .into();
        assert!(matches!(err, DocsError::SerializationError(_)));
        assert!(err.to_string().contains("serialize"));
    }

    #[test]
    fn test_schema_conflict_message() {
        let err = DocsError::schema_conflict("WithSchemaQuery");
        assert_eq!(
            err.to_string(),
            "schema 'WithSchemaQuery' is already registered"
        );
    }

    #[test]
    fn test_operation_conflict_message() {
        let err = DocsError::operation_conflict(&http::Method::POST, "/post-with-schema");
        assert!(err.to_string().contains("POST /post-with-schema"));
    }
}
