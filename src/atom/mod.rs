//! Atoms: typed nodes and links of the knowledge hypergraph.
//!
//! An atom has a stable id, a type from a closed set, an optional name and
//! an ordered `outgoing` list of the atoms it references. The `incoming`
//! list is owned by the [`AtomSpace`](crate::AtomSpace) and never set by
//! callers.

mod truth;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use truth::{TruthValue, TruthValuePatch, DEFAULT_CONFIDENCE, DEFAULT_COUNT, DEFAULT_STRENGTH};

/// Open, JSON-like metadata bag attached to an atom.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Globally unique, immutable atom identifier.
///
/// # Examples
///
/// ```
/// use hypergraph_cog::AtomId;
///
/// let id = AtomId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomId(Uuid);

impl AtomId {
    /// Creates a new random atom ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil atom ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for AtomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AtomId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Closed set of atom types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomType {
    /// A concept node.
    Concept,
    /// A predicate node.
    Predicate,
    /// Predicate applied to arguments.
    Evaluation,
    /// Subset relationship.
    Inheritance,
    /// Symmetric similarity.
    Similarity,
    /// Conditional: `outgoing[0]` implies `outgoing[1]`.
    Implication,
    /// Mutual implication.
    Equivalence,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Negation.
    Not,
    /// Universal quantifier.
    #[serde(rename = "forall")]
    ForAll,
    /// Existential quantifier.
    Exists,
}

impl AtomType {
    /// All atom types in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Concept,
        Self::Predicate,
        Self::Evaluation,
        Self::Inheritance,
        Self::Similarity,
        Self::Implication,
        Self::Equivalence,
        Self::And,
        Self::Or,
        Self::Not,
        Self::ForAll,
        Self::Exists,
    ];

    /// Returns the stable lowercase name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Predicate => "predicate",
            Self::Evaluation => "evaluation",
            Self::Inheritance => "inheritance",
            Self::Similarity => "similarity",
            Self::Implication => "implication",
            Self::Equivalence => "equivalence",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::ForAll => "forall",
            Self::Exists => "exists",
        }
    }

    /// Returns true for node types (concept, predicate).
    #[must_use]
    pub const fn is_node(&self) -> bool {
        matches!(self, Self::Concept | Self::Predicate)
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed node or hyperedge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Stable identifier.
    pub id: AtomId,

    /// Atom type.
    #[serde(rename = "type")]
    pub atom_type: AtomType,

    /// Optional, non-unique label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Probabilistic belief in this atom.
    pub truth_value: TruthValue,

    /// Ordered ids this atom references.
    #[serde(default)]
    pub outgoing: Vec<AtomId>,

    /// Ids of atoms referencing this one. Maintained by the store.
    #[serde(default)]
    pub incoming: Vec<AtomId>,

    /// Open metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: Metadata,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Atom {
    /// Creates a detached atom with a fresh id and default truth value.
    #[must_use]
    pub fn new(atom_type: AtomType, name: Option<String>) -> Self {
        Self::with_id(AtomId::new(), atom_type, name)
    }

    /// Creates a detached atom with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: AtomId, atom_type: AtomType, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            atom_type,
            name,
            truth_value: TruthValue::default(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the outgoing list.
    #[must_use]
    pub fn outgoing(mut self, outgoing: Vec<AtomId>) -> Self {
        self.outgoing = outgoing;
        self
    }

    /// Sets the truth value.
    #[must_use]
    pub fn truth(mut self, truth_value: TruthValue) -> Self {
        self.truth_value = truth_value;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Shorthand for the truth value strength.
    #[must_use]
    pub const fn strength(&self) -> f64 {
        self.truth_value.strength()
    }

    /// Shorthand for the truth value confidence.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.truth_value.confidence()
    }

    /// Returns true if this atom has the given structural identity.
    #[must_use]
    pub fn has_key(&self, atom_type: AtomType, name: Option<&str>, outgoing: &[AtomId]) -> bool {
        self.atom_type == atom_type && self.name.as_deref() == name && self.outgoing == outgoing
    }

    /// Human-readable label: the name if present, otherwise the id.
    #[must_use]
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Caller-facing description of an atom to add to the store.
///
/// # Examples
///
/// ```
/// use hypergraph_cog::{AtomSpec, AtomType};
///
/// let spec = AtomSpec::concept("cat").strength(0.9).confidence(0.8);
/// assert_eq!(spec.atom_type, AtomType::Concept);
/// assert_eq!(spec.name.as_deref(), Some("cat"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomSpec {
    /// Atom type.
    #[serde(rename = "type")]
    pub atom_type: AtomType,
    /// Optional label.
    #[serde(default)]
    pub name: Option<String>,
    /// Ordered outgoing ids.
    #[serde(default)]
    pub outgoing: Vec<AtomId>,
    /// Partial truth value.
    #[serde(default)]
    pub truth_value: TruthValuePatch,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl AtomSpec {
    /// Starts a spec for the given type.
    #[must_use]
    pub fn new(atom_type: AtomType) -> Self {
        Self {
            atom_type,
            name: None,
            outgoing: Vec::new(),
            truth_value: TruthValuePatch::default(),
            metadata: Metadata::new(),
        }
    }

    /// Named concept node.
    #[must_use]
    pub fn concept(name: impl Into<String>) -> Self {
        Self::new(AtomType::Concept).name(name)
    }

    /// Named predicate node.
    #[must_use]
    pub fn predicate(name: impl Into<String>) -> Self {
        Self::new(AtomType::Predicate).name(name)
    }

    /// Link of the given type over `outgoing`.
    #[must_use]
    pub fn link(atom_type: AtomType, outgoing: Vec<AtomId>) -> Self {
        Self::new(atom_type).outgoing(outgoing)
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the outgoing list.
    #[must_use]
    pub fn outgoing(mut self, outgoing: Vec<AtomId>) -> Self {
        self.outgoing = outgoing;
        self
    }

    /// Sets the strength.
    #[must_use]
    pub fn strength(mut self, strength: f64) -> Self {
        self.truth_value.strength = Some(strength);
        self
    }

    /// Sets the confidence.
    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.truth_value.confidence = Some(confidence);
        self
    }

    /// Sets the evidence count.
    #[must_use]
    pub fn count(mut self, count: u64) -> Self {
        self.truth_value.count = Some(count);
        self
    }

    /// Sets the whole truth value.
    #[must_use]
    pub fn truth(mut self, truth_value: TruthValue) -> Self {
        self.truth_value = truth_value.into();
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Materializes the spec into a detached atom with a fresh id.
    #[must_use]
    pub fn into_atom(self) -> Atom {
        let mut atom = Atom::new(self.atom_type, self.name)
            .outgoing(self.outgoing)
            .truth(self.truth_value.resolve());
        atom.metadata = self.metadata;
        atom
    }
}
