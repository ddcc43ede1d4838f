//! Pattern matching over the atom store.
//!
//! The engine borrows the store and never mutates it. Every query is a
//! linear scan in insertion order, followed by a stable sort on relevance.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::atom::Atom;
use crate::query::pattern::HypergraphPattern;
use crate::space::AtomSpace;

/// Bonus for an atom whose name is exactly the one asked for.
const EXACT_NAME_BONUS: f64 = 0.5;

/// Bonus for an atom matched through a type constraint.
const TYPE_MATCH_BONUS: f64 = 0.3;

/// Weight of the evidence term `ln(count + 1)`.
const EVIDENCE_WEIGHT: f64 = 0.1;

/// One matched atom.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMatch {
    /// The matched atom.
    pub atom: Atom,
    /// Relevance score used for ordering.
    pub score: f64,
    /// Atoms bound by `variable` names anywhere in the pattern tree.
    pub bindings: HashMap<String, Atom>,
}

/// Result of [`HypergraphQueryEngine::query`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Page of matches, best first.
    pub matches: Vec<QueryMatch>,
    /// Matches before pagination.
    pub total_count: usize,
    /// Wall-clock time spent.
    pub execution_time: Duration,
}

/// Read-only pattern matcher and traversal toolkit.
#[derive(Debug, Clone, Copy)]
pub struct HypergraphQueryEngine<'a> {
    pub(crate) space: &'a AtomSpace,
}

impl<'a> HypergraphQueryEngine<'a> {
    /// Create an engine over `space`.
    #[must_use]
    pub const fn new(space: &'a AtomSpace) -> Self {
        Self { space }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn space(&self) -> &'a AtomSpace {
        self.space
    }

    /// Match `pattern` against every atom, rank, then paginate.
    #[must_use]
    pub fn query(&self, pattern: &HypergraphPattern) -> QueryResult {
        let started = Instant::now();

        let mut matches: Vec<QueryMatch> = Vec::new();
        for atom in self.space.iter() {
            let mut bindings = HashMap::new();
            if self.match_atom(atom, pattern, &mut bindings) {
                matches.push(QueryMatch {
                    atom: atom.clone(),
                    score: relevance_score(atom, pattern),
                    bindings,
                });
            }
        }
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));

        let total_count = matches.len();
        let offset = pattern.offset.unwrap_or(0);
        let limit = pattern.limit.unwrap_or(usize::MAX);
        let matches: Vec<QueryMatch> = matches.into_iter().skip(offset).take(limit).collect();

        tracing::trace!(total_count, returned = matches.len(), "hypergraph query");
        QueryResult {
            matches,
            total_count,
            execution_time: started.elapsed(),
        }
    }

    /// Returns true if `atom` satisfies `pattern`, including nested outgoing patterns.
    #[must_use]
    pub fn matches(&self, atom: &Atom, pattern: &HypergraphPattern) -> bool {
        let mut scratch = HashMap::new();
        self.match_atom(atom, pattern, &mut scratch)
    }

    fn match_atom(
        &self,
        atom: &Atom,
        pattern: &HypergraphPattern,
        bindings: &mut HashMap<String, Atom>,
    ) -> bool {
        if !pattern.accepts_local(atom) {
            return false;
        }

        if let Some(subpatterns) = &pattern.outgoing {
            if atom.outgoing.len() != subpatterns.len() {
                return false;
            }
            for (id, sub) in atom.outgoing.iter().zip(subpatterns) {
                let Some(child) = self.space.get_atom(*id) else {
                    return false;
                };
                if !self.match_atom(child, sub, bindings) {
                    return false;
                }
            }
        }

        if let Some(variable) = &pattern.variable {
            bindings.insert(variable.clone(), atom.clone());
        }
        true
    }
}

/// `strength * confidence + ln(count + 1) * 0.1`, plus name and type bonuses.
fn relevance_score(atom: &Atom, pattern: &HypergraphPattern) -> f64 {
    let tv = &atom.truth_value;
    #[allow(clippy::cast_precision_loss)]
    let evidence = ((tv.count() as f64) + 1.0).ln() * EVIDENCE_WEIGHT;
    let mut score = tv.strength() * tv.confidence() + evidence;

    if pattern
        .name
        .as_ref()
        .is_some_and(|nf| nf.is_exact_match(atom.name.as_deref()))
    {
        score += EXACT_NAME_BONUS;
    }
    if pattern
        .atom_type
        .as_ref()
        .is_some_and(|tf| tf.accepts(atom.atom_type))
    {
        score += TYPE_MATCH_BONUS;
    }
    score
}
