//! Error types for field definitions

use thiserror::Error;

/// Result type for field operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while reading or checking field definitions
#[derive(Debug, Error)]
pub enum FieldsError {
    /// A field record could not be turned into a `Field`
    #[error("malformed field: {message}")]
    MalformedField { message: String },

    /// Field has no name
    #[error("field {id} has an empty name")]
    EmptyName { id: String },

    /// A root-only type was given a parent
    #[error("field '{name}' of type {field_type} cannot be nested")]
    RootOnlyType { name: String, field_type: String },

    /// Parent id does not name a nestable field in scope
    #[error("parent field not found: {id}")]
    ParentNotFound { id: String },

    /// Attaching the field to its parent would create a loop
    #[error("field '{name}' would become its own ancestor")]
    ParentCycle { name: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FieldsError {
    /// Create a malformed field error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedField {
            message: message.into(),
        }
    }
}
