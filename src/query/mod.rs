//! Declarative pattern queries and graph traversal.
//!
//! Patterns are plain data ([`HypergraphPattern`]) that can be built in code
//! or deserialized from JSON. The engine borrows an [`AtomSpace`](crate::AtomSpace)
//! and never mutates it.

mod engine;
pub mod pattern;
mod traversal;

pub use engine::{HypergraphQueryEngine, QueryMatch, QueryResult};
pub use pattern::{FilterOp, HypergraphPattern, NameFilter, TruthValueFilter, TypeFilter};
pub use traversal::{
    Direction, GraphStatistics, PathQuery, Subgraph, SubgraphQuery, TraversalQuery,
    DEFAULT_PATH_DEPTH, DEFAULT_TRAVERSAL_DEPTH,
};
