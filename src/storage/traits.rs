//! Collaborator traits for persistence and vectorization.
//!
//! The atom store calls these best-effort after an atom is created or
//! merged. Failures are logged by the dispatcher and never reach the caller.

use thiserror::Error;

use crate::atom::{Atom, AtomId};

/// Errors raised by persistence and vectorization backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Vectorization requires a named atom.
    #[error("Atom {0} has no name to vectorize")]
    MissingName(AtomId),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// The hook queue is full; the job was dropped.
    #[error("Hook queue is full (capacity {capacity})")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },

    /// The hook worker is gone.
    #[error("Hook worker disconnected")]
    Disconnected,
}

/// Durable sink for atoms.
pub trait AtomPersistence: Send + Sync {
    /// Persist the current state of an atom.
    fn persist(&self, atom: &Atom) -> Result<(), StorageError>;
}

/// Embedding sink for atoms.
pub trait AtomVectorizer: Send + Sync {
    /// Compute and store an embedding for a named atom.
    ///
    /// # Errors
    /// - `MissingName`: the atom has no name.
    fn vectorize(&self, atom: &Atom) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_persistence_object_safe(_: &dyn AtomPersistence) {}
    fn _assert_vectorizer_object_safe(_: &dyn AtomVectorizer) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::MissingName(AtomId::nil());
        assert!(err.to_string().contains("no name"));

        let err = StorageError::QueueFull { capacity: 8 };
        assert!(err.to_string().contains('8'));
    }
}
