//! Error types for advocacy-intake

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    /// No valid caller identity
    #[error("Authentication required")]
    Unauthenticated,

    /// Valid caller lacking the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or out-of-range input, named by field
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    /// Well-formed request with nothing to apply
    #[error("{0}")]
    NoOp(String),

    /// Underlying store failure. The detail is for operators only.
    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntakeError {
    /// Build a validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field named by a validation error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type alias for intake operations
pub type Result<T> = std::result::Result<T, IntakeError>;
