//! Error types for the metadata index

use metamenu_fields::FieldsError;
use thiserror::Error;

/// Result type for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building or updating the index.
///
/// None of these abort a full pass: each is caught at the granularity of one
/// class, document, query or external step and recorded in the pass report.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A class definition or one of its fields could not be parsed
    #[error("malformed class definition {path}: {message}")]
    MalformedDefinition { path: String, message: String },

    /// A class name or parent id points at nothing
    #[error("unresolved reference '{reference}' in {path}")]
    UnresolvedReference { path: String, reference: String },

    /// The query engine or the document cache is not ready yet
    #[error("{what} is not available yet")]
    ExternalDependencyUnavailable { what: String },

    /// A single document could not be read or parsed
    #[error("could not read {path}: {message}")]
    TransientReadFailure { path: String, message: String },

    /// The query engine rejected or failed a query
    #[error("query '{query}' failed: {message}")]
    Query { query: String, message: String },

    /// Document does not exist in the store
    #[error("document not found: {path}")]
    DocumentNotFound { path: String },

    /// A host-provided step (lookups, formulas, canvas, migration) failed
    #[error("external step '{step}' failed: {message}")]
    External { step: String, message: String },

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Field definition error
    #[error(transparent)]
    Fields(#[from] FieldsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl IndexError {
    /// Create a malformed definition error
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved(path: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            path: path.into(),
            reference: reference.into(),
        }
    }

    /// Create an unavailable dependency error
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::ExternalDependencyUnavailable { what: what.into() }
    }

    /// Create a read failure error
    pub fn read_failure(path: impl Into<String>, message: impl ToString) -> Self {
        Self::TransientReadFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a query error
    pub fn query(query: impl Into<String>, message: impl ToString) -> Self {
        Self::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }

    /// Create an external step error
    pub fn external(step: impl Into<String>, message: impl ToString) -> Self {
        Self::External {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// Whether the next externally triggered pass may succeed where this one failed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ExternalDependencyUnavailable { .. }
                | Self::TransientReadFailure { .. }
                | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexError::malformed("Classes/Book.md", "fields is not a list");
        assert_eq!(
            err.to_string(),
            "malformed class definition Classes/Book.md: fields is not a list"
        );
    }

    #[test]
    fn test_unresolved_reference() {
        let err = IndexError::unresolved("note.md", "Missing");
        assert!(err.to_string().contains("Missing"));
        assert!(err.to_string().contains("note.md"));
    }

    #[test]
    fn test_transient() {
        assert!(IndexError::read_failure("a.canvas", "bad json").is_transient());
        assert!(!IndexError::malformed("x", "y").is_transient());
    }
}
