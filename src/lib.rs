//! # hypergraph-cog - an in-memory cognitive knowledge graph
//!
//! A typed hypergraph store with probabilistic truth values, an economic
//! attention bank, a declarative pattern query engine and a small PLN
//! reasoner, all sharing one data model: the [`Atom`].
//!
//! ## Core Concepts
//!
//! - **Atom**: a typed node (concept, predicate) or hyperedge linking other atoms
//! - **TruthValue**: strength, confidence and evidence count, revised on duplicate insert
//! - **AttentionBank**: bounded short- and long-term importance with a focus set
//! - **HypergraphPattern**: JSON-friendly pattern with nested outgoing sub-patterns
//! - **PlnReasoner**: deduction, induction, modus ponens and conjunction
//!
//! ## Usage
//!
//! ```rust
//! use hypergraph_cog::{AtomSpace, AtomSpec, AtomType, FilterOp, HypergraphPattern};
//! use serde_json::json;
//!
//! let mut space = AtomSpace::new();
//! let cat = space.add_atom(AtomSpec::concept("cat").strength(0.9).confidence(0.8));
//! let animal = space.add_atom(AtomSpec::concept("animal"));
//! space.add_atom(AtomSpec::link(AtomType::Inheritance, vec![cat.id, animal.id]));
//!
//! let pattern = HypergraphPattern::new()
//!     .of_type(AtomType::Concept)
//!     .strength(FilterOp::Gt(json!(0.7)));
//! let result = space.query_engine().query(&pattern);
//! assert_eq!(result.total_count, 1);
//! assert_eq!(result.matches[0].atom.id, cat.id);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod atom;
pub mod attention;
pub mod config;
pub mod embedding;
pub mod error;
pub mod query;
pub mod reasoning;
pub mod space;
pub mod storage;

pub use atom::{Atom, AtomId, AtomSpec, AtomType, Metadata, TruthValue, TruthValuePatch};
pub use attention::{
    AttentionBank, AttentionCycle, AttentionStatistics, AttentionValue, CycleReport,
    StiDistribution,
};
pub use config::{AttentionConfig, EngineConfig, HookConfig, ReasonerConfig};
pub use error::{GraphError, GraphResult, ValidationError};
pub use query::{
    Direction, FilterOp, GraphStatistics, HypergraphPattern, HypergraphQueryEngine, PathQuery,
    QueryMatch, QueryResult, Subgraph, SubgraphQuery, TraversalQuery,
};
pub use reasoning::{InferenceRecord, InferenceResult, InferenceRule, InferenceRunId, PlnReasoner};
pub use space::{AtomFilter, AtomSpace};
pub use storage::{
    AtomPersistence, AtomVectorizer, HookDispatcher, InMemoryAtomArchive, LexicalVectorIndex,
    StorageError,
};
