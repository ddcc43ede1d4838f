//! Collaborators of the atom store.
//!
//! Persistence and vectorization are external concerns reached through two
//! object-safe traits. In-memory backends are provided for embedded use and
//! tests, and the dispatcher runs them off the caller's path.

mod dispatch;
mod memory;
mod traits;

pub use dispatch::HookDispatcher;
pub use memory::{InMemoryAtomArchive, LexicalVectorIndex};
pub use traits::{AtomPersistence, AtomVectorizer, StorageError};
