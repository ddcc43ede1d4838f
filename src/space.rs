//! The atom store.
//!
//! `AtomSpace` exclusively owns the atom map and its indices: by type, by
//! name, and the `outgoing -> incoming` back-references stored on the atoms
//! themselves. Every mutating call updates all of them before returning.
//!
//! Atoms are deduplicated on `(type, name, outgoing)`. Adding a duplicate
//! revises the stored truth value instead of creating a second atom.
//!
//! Links may reference ids that are not stored yet. Such references are
//! parked and the target's `incoming` list is filled once an atom with that
//! id is inserted.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::atom::{Atom, AtomId, AtomSpec, AtomType, Metadata, TruthValue};
use crate::query::HypergraphQueryEngine;
use crate::reasoning::InferenceResult;
use crate::storage::HookDispatcher;

/// AND-combined filter for [`AtomSpace::query_atoms`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomFilter {
    /// Exact type.
    pub atom_type: Option<AtomType>,
    /// Exact name.
    pub name: Option<String>,
    /// Ids that must all appear in the atom's outgoing list.
    pub outgoing: Vec<AtomId>,
    /// Minimum strength (inclusive).
    pub min_strength: Option<f64>,
    /// Minimum confidence (inclusive).
    pub min_confidence: Option<f64>,
    /// Minimum evidence count (inclusive).
    pub min_count: Option<u64>,
    /// Entries that must be present with equal values.
    pub metadata: Metadata,
}

impl AtomFilter {
    /// Filter on type only.
    #[must_use]
    pub fn of_type(atom_type: AtomType) -> Self {
        Self {
            atom_type: Some(atom_type),
            ..Self::default()
        }
    }

    /// Returns true if `atom` passes every present criterion.
    #[must_use]
    pub fn matches(&self, atom: &Atom) -> bool {
        if self.atom_type.is_some_and(|t| t != atom.atom_type) {
            return false;
        }
        if let Some(name) = self.name.as_deref() {
            if atom.name.as_deref() != Some(name) {
                return false;
            }
        }
        if !self.outgoing.iter().all(|id| atom.outgoing.contains(id)) {
            return false;
        }
        let tv = &atom.truth_value;
        if self.min_strength.is_some_and(|min| tv.strength() < min)
            || self.min_confidence.is_some_and(|min| tv.confidence() < min)
            || self.min_count.is_some_and(|min| tv.count() < min)
        {
            return false;
        }
        self.metadata
            .iter()
            .all(|(k, v)| atom.metadata.get(k) == Some(v))
    }
}

/// In-memory hypergraph store.
#[derive(Debug, Default)]
pub struct AtomSpace {
    atoms: HashMap<AtomId, Atom>,
    by_type: HashMap<AtomType, HashSet<AtomId>>,
    by_name: HashMap<String, HashSet<AtomId>>,
    sequence: HashMap<AtomId, u64>,
    by_sequence: BTreeMap<u64, AtomId>,
    next_sequence: u64,
    pending_incoming: HashMap<AtomId, Vec<AtomId>>,
    hooks: Option<HookDispatcher>,
}

impl AtomSpace {
    /// Create a new empty store without collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a persistence/vectorization dispatcher.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookDispatcher) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Returns the attached dispatcher, if any.
    #[must_use]
    pub fn hooks(&self) -> Option<&HookDispatcher> {
        self.hooks.as_ref()
    }

    /// Add an atom, merging into an existing one with the same `(type, name, outgoing)`.
    ///
    /// Returns a snapshot of the stored atom. On merge the existing id is kept.
    pub fn add_atom(&mut self, spec: AtomSpec) -> Atom {
        self.insert_or_merge(spec.into_atom())
    }

    /// Insert a fully formed atom, keeping its id.
    ///
    /// An atom whose id is already stored is revised into the stored one.
    /// An unnamed atom without outgoing links has no identity beyond its id,
    /// so it is stored as is. Everything else goes through the usual
    /// deduplication. Caller-provided `incoming` lists are ignored.
    pub fn insert_atom(&mut self, atom: Atom) -> Atom {
        if let Some(merged) = self.merge_into(atom.id, &atom.truth_value, &atom.metadata) {
            return merged;
        }
        if atom.name.is_none() && atom.outgoing.is_empty() {
            return self.insert_new(atom);
        }
        self.insert_or_merge(atom)
    }

    /// Insert every atom derived by an inference result.
    pub fn absorb(&mut self, result: &InferenceResult) -> Vec<Atom> {
        result
            .derived_atoms
            .iter()
            .map(|atom| self.insert_atom(atom.clone()))
            .collect()
    }

    /// Get an atom by id.
    #[must_use]
    pub fn get_atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(&id)
    }

    /// Returns true if the atom is stored.
    #[must_use]
    pub fn contains(&self, id: AtomId) -> bool {
        self.atoms.contains_key(&id)
    }

    /// All atoms of a type, in insertion order.
    #[must_use]
    pub fn get_atoms_by_type(&self, atom_type: AtomType) -> Vec<&Atom> {
        self.resolve_index(self.by_type.get(&atom_type))
    }

    /// All atoms with exactly this name, in insertion order.
    #[must_use]
    pub fn get_atoms_by_name(&self, name: &str) -> Vec<&Atom> {
        self.resolve_index(self.by_name.get(name))
    }

    /// Linear scan with AND-combined criteria.
    #[must_use]
    pub fn query_atoms(&self, filter: &AtomFilter) -> Vec<&Atom> {
        self.iter().filter(|atom| filter.matches(atom)).collect()
    }

    /// Replace the truth value of a stored atom.
    pub fn update_truth_value(&mut self, id: AtomId, truth_value: TruthValue) -> Option<&Atom> {
        let atom = self.atoms.get_mut(&id)?;
        atom.truth_value = TruthValue::new(
            truth_value.strength(),
            truth_value.confidence(),
            truth_value.count(),
        );
        atom.updated_at = Utc::now();
        if let Some(hooks) = &self.hooks {
            hooks.submit(atom);
        }
        Some(atom)
    }

    /// Remove an atom and every index entry pointing at it.
    ///
    /// Atoms that link to the removed one keep the id in their `outgoing`;
    /// those references become pending again.
    pub fn remove_atom(&mut self, id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(&id)?;

        if let Some(set) = self.by_type.get_mut(&atom.atom_type) {
            set.remove(&id);
            if set.is_empty() {
                self.by_type.remove(&atom.atom_type);
            }
        }
        if let Some(name) = atom.name.as_deref() {
            if let Some(set) = self.by_name.get_mut(name) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_name.remove(name);
                }
            }
        }
        if let Some(seq) = self.sequence.remove(&id) {
            self.by_sequence.remove(&seq);
        }

        for target in &atom.outgoing {
            if let Some(t) = self.atoms.get_mut(target) {
                t.incoming.retain(|src| *src != id);
            }
        }
        self.pending_incoming.retain(|_, sources| {
            sources.retain(|src| *src != id);
            !sources.is_empty()
        });

        let referrers: Vec<AtomId> = atom
            .incoming
            .iter()
            .copied()
            .filter(|src| *src != id && self.atoms.contains_key(src))
            .collect();
        if !referrers.is_empty() {
            self.pending_incoming.insert(id, referrers);
        }

        tracing::debug!(atom_id = %id, atom_type = %atom.atom_type, "removed atom");
        Some(atom)
    }

    /// Number of stored atoms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns true if no atom is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Iterate over atoms in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> + '_ {
        self.by_sequence.values().filter_map(|id| self.atoms.get(id))
    }

    /// Owned snapshot of every atom in insertion order.
    #[must_use]
    pub fn atoms(&self) -> Vec<Atom> {
        self.iter().cloned().collect()
    }

    /// Read-only query engine over this store.
    #[must_use]
    pub fn query_engine(&self) -> HypergraphQueryEngine<'_> {
        HypergraphQueryEngine::new(self)
    }

    fn resolve_index(&self, ids: Option<&HashSet<AtomId>>) -> Vec<&Atom> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        let mut ordered: Vec<(u64, &Atom)> = ids
            .iter()
            .filter_map(|id| Some((*self.sequence.get(id)?, self.atoms.get(id)?)))
            .collect();
        ordered.sort_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, atom)| atom).collect()
    }

    fn find_duplicate(&self, atom: &Atom) -> Option<AtomId> {
        let candidates = match atom.name.as_deref() {
            Some(name) => self.by_name.get(name)?,
            None => self.by_type.get(&atom.atom_type)?,
        };
        candidates.iter().copied().find(|id| {
            self.atoms
                .get(id)
                .is_some_and(|a| a.has_key(atom.atom_type, atom.name.as_deref(), &atom.outgoing))
        })
    }

    fn insert_or_merge(&mut self, atom: Atom) -> Atom {
        if let Some(existing) = self.find_duplicate(&atom) {
            if let Some(merged) = self.merge_into(existing, &atom.truth_value, &atom.metadata) {
                return merged;
            }
        }
        self.insert_new(atom)
    }

    fn merge_into(
        &mut self,
        id: AtomId,
        truth_value: &TruthValue,
        metadata: &Metadata,
    ) -> Option<Atom> {
        let existing = self.atoms.get_mut(&id)?;
        existing.truth_value = existing.truth_value.revise(truth_value);
        for (k, v) in metadata {
            existing.metadata.insert(k.clone(), v.clone());
        }
        existing.updated_at = Utc::now();
        tracing::debug!(
            atom_id = %id,
            count = existing.truth_value.count(),
            "merged duplicate atom"
        );

        if let Some(hooks) = &self.hooks {
            hooks.submit(existing);
        }
        Some(existing.clone())
    }

    fn insert_new(&mut self, mut atom: Atom) -> Atom {
        let id = atom.id;
        atom.incoming = self.pending_incoming.remove(&id).unwrap_or_default();

        for target in atom.outgoing.clone() {
            if target == id {
                if !atom.incoming.contains(&id) {
                    atom.incoming.push(id);
                }
            } else if let Some(t) = self.atoms.get_mut(&target) {
                if !t.incoming.contains(&id) {
                    t.incoming.push(id);
                }
            } else {
                let pending = self.pending_incoming.entry(target).or_default();
                if !pending.contains(&id) {
                    pending.push(id);
                }
            }
        }

        self.by_type.entry(atom.atom_type).or_default().insert(id);
        if let Some(name) = atom.name.clone() {
            self.by_name.entry(name).or_default().insert(id);
        }
        let seq = self.next_sequence;
        self.next_sequence += 1;
        self.sequence.insert(id, seq);
        self.by_sequence.insert(seq, id);

        tracing::debug!(atom_id = %id, atom_type = %atom.atom_type, "inserted atom");
        if let Some(hooks) = &self.hooks {
            hooks.submit(&atom);
        }
        self.atoms.insert(id, atom.clone());
        atom
    }
}
