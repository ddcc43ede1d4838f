//! Error types for the hypergraph engine.
//!
//! All errors are strongly typed using thiserror. Unknown atom ids are
//! never errors: lookups return `Option` or empty collections instead.

use thiserror::Error;

pub use crate::storage::StorageError;

/// Validation errors raised while building patterns or loading configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        pattern: String,
        reason: String,
    },

    #[error("Invalid pattern: {message}")]
    InvalidPattern {
        message: String,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
    },
}

impl ValidationError {
    /// Creates an `InvalidConfig` error.
    #[must_use]
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for the engine.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl GraphError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a collaborator (storage) error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for engine operations.
pub type GraphResult<T> = Result<T, GraphError>;
