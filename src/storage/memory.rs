//! In-memory collaborator backends.
//!
//! Thread-safe reference implementations of [`AtomPersistence`] and
//! [`AtomVectorizer`], intended for embedded usage and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::atom::{Atom, AtomId};
use crate::embedding::{cosine_similarity, lexical_embedding_with_dim, DEFAULT_EMBEDDING_DIM};
use crate::storage::traits::{AtomPersistence, AtomVectorizer, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Keeps the last persisted snapshot of every atom.
#[derive(Debug, Default)]
pub struct InMemoryAtomArchive {
    atoms: RwLock<HashMap<AtomId, Atom>>,
}

impl InMemoryAtomArchive {
    /// Create a new empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the persisted snapshot of an atom.
    pub fn get(&self, id: AtomId) -> Result<Option<Atom>, StorageError> {
        let atoms = self.atoms.read().map_err(|_| lock_err("archive.get"))?;
        Ok(atoms.get(&id).cloned())
    }

    /// Number of persisted atoms.
    pub fn len(&self) -> Result<usize, StorageError> {
        let atoms = self.atoms.read().map_err(|_| lock_err("archive.len"))?;
        Ok(atoms.len())
    }
}

impl AtomPersistence for InMemoryAtomArchive {
    fn persist(&self, atom: &Atom) -> Result<(), StorageError> {
        let mut atoms = self.atoms.write().map_err(|_| lock_err("archive.persist"))?;
        atoms.insert(atom.id, atom.clone());
        Ok(())
    }
}

/// Vector index over lexical embeddings of atom names.
#[derive(Debug)]
pub struct LexicalVectorIndex {
    dim: usize,
    vectors: RwLock<HashMap<AtomId, Vec<f32>>>,
}

impl Default for LexicalVectorIndex {
    fn default() -> Self {
        Self::with_dim(DEFAULT_EMBEDDING_DIM)
    }
}

impl LexicalVectorIndex {
    /// Create an index with the default dimension.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with a custom dimension.
    #[must_use]
    pub fn with_dim(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            vectors: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored embedding of an atom.
    pub fn embedding(&self, id: AtomId) -> Result<Option<Vec<f32>>, StorageError> {
        let vectors = self.vectors.read().map_err(|_| lock_err("vectors.embedding"))?;
        Ok(vectors.get(&id).cloned())
    }

    /// Atoms whose name embedding is most similar to `text`, best first.
    pub fn nearest(&self, text: &str, limit: usize) -> Result<Vec<(AtomId, f32)>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = lexical_embedding_with_dim(text, self.dim);
        let vectors = self.vectors.read().map_err(|_| lock_err("vectors.nearest"))?;

        let mut scored: Vec<(AtomId, f32)> = vectors
            .iter()
            .map(|(id, v)| (*id, cosine_similarity(&query, v)))
            .filter(|(_, sim)| *sim > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        Ok(scored)
    }
}

impl AtomVectorizer for LexicalVectorIndex {
    fn vectorize(&self, atom: &Atom) -> Result<(), StorageError> {
        let Some(name) = atom.name.as_deref() else {
            return Err(StorageError::MissingName(atom.id));
        };
        let embedding = lexical_embedding_with_dim(name, self.dim);
        let mut vectors = self.vectors.write().map_err(|_| lock_err("vectors.vectorize"))?;
        vectors.insert(atom.id, embedding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{AtomSpec, AtomType};

    #[test]
    fn archive_keeps_latest_snapshot() {
        let archive = InMemoryAtomArchive::new();
        let mut atom = AtomSpec::concept("cat").into_atom();
        archive.persist(&atom).unwrap();
        atom.name = Some("kitten".to_string());
        archive.persist(&atom).unwrap();

        assert_eq!(archive.len().unwrap(), 1);
        let stored = archive.get(atom.id).unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("kitten"));
    }

    #[test]
    fn vectorize_requires_name() {
        let index = LexicalVectorIndex::new();
        let atom = AtomSpec::new(AtomType::And).into_atom();
        let err = index.vectorize(&atom).unwrap_err();
        assert!(matches!(err, StorageError::MissingName(id) if id == atom.id));
    }

    #[test]
    fn nearest_ranks_matching_names_first() {
        let index = LexicalVectorIndex::new();
        let cat = AtomSpec::concept("black cat").into_atom();
        let car = AtomSpec::concept("red car").into_atom();
        index.vectorize(&cat).unwrap();
        index.vectorize(&car).unwrap();

        let hits = index.nearest("black cat", 2).unwrap();
        assert_eq!(hits.first().map(|h| h.0), Some(cat.id));
        assert_eq!(index.embedding(cat.id).unwrap().map(|v| v.len()), Some(DEFAULT_EMBEDDING_DIM));
    }
}
