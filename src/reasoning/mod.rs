//! Probabilistic Logic Network reasoning.
//!
//! The reasoner is stateless per call: it reads an atom slice (usually the
//! attention focus) and returns candidate atoms with explanations. Writing
//! them back is the caller's job, see [`AtomSpace::absorb`](crate::AtomSpace::absorb).
//! The only state it keeps is a bounded introspection log of past invocations.

mod rules;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::atom::{Atom, AtomId};
use crate::config::ReasonerConfig;

/// Inference rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceRule {
    /// `(A -> B), (B -> C) |- (A -> C)`.
    Deduction,
    /// Generalization from repeated evaluations.
    Induction,
    /// `A, (A -> B) |- B`.
    ModusPonens,
    /// `A, B |- (A and B)`.
    Conjunction,
}

impl InferenceRule {
    /// Order used when the caller does not pick rules.
    pub const DEFAULT_ORDER: [Self; 4] = [
        Self::Deduction,
        Self::Induction,
        Self::ModusPonens,
        Self::Conjunction,
    ];

    /// Stable identifier used in logs and metadata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deduction => "deduction",
            Self::Induction => "induction",
            Self::ModusPonens => "modus_ponens",
            Self::Conjunction => "conjunction",
        }
    }
}

impl fmt::Display for InferenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Candidate atoms, ready for [`AtomSpace::insert_atom`](crate::AtomSpace::insert_atom).
    pub derived_atoms: Vec<Atom>,
    /// Rule that fired.
    pub rule: InferenceRule,
    /// Ids of the atoms the rule consumed.
    pub premises: Vec<AtomId>,
    /// Confidence of the conclusion.
    pub confidence: f64,
    /// Human-readable account of the step.
    pub explanation: String,
}

impl InferenceResult {
    /// Returns true if any derived atom, its outgoing set, or any premise is in `ids`.
    #[must_use]
    pub fn mentions_any(&self, ids: &[AtomId]) -> bool {
        self.premises.iter().any(|p| ids.contains(p))
            || self
                .derived_atoms
                .iter()
                .any(|a| ids.contains(&a.id) || a.outgoing.iter().any(|o| ids.contains(o)))
    }
}

/// Identifier of one [`PlnReasoner::perform_inference`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InferenceRunId(uuid::Uuid);

impl InferenceRunId {
    /// Creates a new random run id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for InferenceRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InferenceRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Introspection record of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    /// Run id.
    pub id: InferenceRunId,
    /// When the call happened.
    pub timestamp: DateTime<Utc>,
    /// Rules actually applied, in order.
    pub rules: Vec<InferenceRule>,
    /// Number of input atoms.
    pub premise_count: usize,
    /// Number of results returned.
    pub result_count: usize,
}

/// Rule-based probabilistic reasoner.
#[derive(Debug, Clone, Default)]
pub struct PlnReasoner {
    config: ReasonerConfig,
    history: HashMap<InferenceRunId, InferenceRecord>,
    history_order: VecDeque<InferenceRunId>,
}

impl PlnReasoner {
    /// Create a reasoner.
    #[must_use]
    pub fn new(config: ReasonerConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
            history_order: VecDeque::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Apply `rules` (default order when `None`) to `atoms`.
    ///
    /// Rules run in order until the accumulated result count reaches
    /// `max_inferences_per_step`. The cap is checked between rules, so the
    /// last rule may overshoot it. Results under `min_confidence_threshold`
    /// are dropped. A non-empty `target_concepts` keeps only results that
    /// mention one of the targets.
    pub fn perform_inference(
        &mut self,
        atoms: &[Atom],
        target_concepts: Option<&[AtomId]>,
        rules: Option<&[InferenceRule]>,
    ) -> Vec<InferenceResult> {
        let rules = rules.unwrap_or(&InferenceRule::DEFAULT_ORDER);

        let mut results: Vec<InferenceResult> = Vec::new();
        let mut applied = Vec::with_capacity(rules.len());
        for rule in rules {
            if results.len() >= self.config.max_inferences_per_step {
                tracing::debug!(
                    cap = self.config.max_inferences_per_step,
                    skipped = %rule,
                    "inference cap reached"
                );
                break;
            }
            results.extend(Self::apply_rule(*rule, atoms));
            applied.push(*rule);
        }

        let threshold = self.config.min_confidence_threshold;
        results.retain(|r| r.confidence >= threshold);
        if let Some(targets) = target_concepts.filter(|t| !t.is_empty()) {
            results.retain(|r| r.mentions_any(targets));
        }

        let record = InferenceRecord {
            id: InferenceRunId::new(),
            timestamp: Utc::now(),
            rules: applied,
            premise_count: atoms.len(),
            result_count: results.len(),
        };
        tracing::debug!(
            run_id = %record.id,
            premises = record.premise_count,
            results = record.result_count,
            "inference step"
        );
        self.history_order.push_back(record.id);
        self.history.insert(record.id, record);
        while self.history_order.len() > self.config.max_history.max(1) {
            if let Some(oldest) = self.history_order.pop_front() {
                self.history.remove(&oldest);
            }
        }

        results
    }

    /// Apply a single rule without the cap or the confidence filter.
    #[must_use]
    pub fn apply_rule(rule: InferenceRule, atoms: &[Atom]) -> Vec<InferenceResult> {
        match rule {
            InferenceRule::Deduction => Self::apply_deduction(atoms),
            InferenceRule::Induction => Self::apply_induction(atoms),
            InferenceRule::ModusPonens => Self::apply_modus_ponens(atoms),
            InferenceRule::Conjunction => Self::apply_conjunction(atoms),
        }
    }

    /// Chain implication pairs: strength `s1*s2`, confidence `c1*c2*s1*s2`.
    #[must_use]
    pub fn apply_deduction(atoms: &[Atom]) -> Vec<InferenceResult> {
        rules::deduction(atoms)
    }

    /// Generalize groups of at least three evaluations of one predicate.
    #[must_use]
    pub fn apply_induction(atoms: &[Atom]) -> Vec<InferenceResult> {
        rules::induction(atoms)
    }

    /// Derive consequents of implications whose antecedent concept is strong.
    #[must_use]
    pub fn apply_modus_ponens(atoms: &[Atom]) -> Vec<InferenceResult> {
        rules::modus_ponens(atoms)
    }

    /// Pair strong, confident concepts.
    #[must_use]
    pub fn apply_conjunction(atoms: &[Atom]) -> Vec<InferenceResult> {
        rules::conjunction(atoms)
    }

    /// Records of past [`perform_inference`](Self::perform_inference) calls.
    ///
    /// Only the latest `max_history` calls are kept.
    #[must_use]
    pub const fn inference_history(&self) -> &HashMap<InferenceRunId, InferenceRecord> {
        &self.history
    }

    /// Forget all records.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.history_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::atom::{AtomType, TruthValue};

    fn concept(name: &str, s: f64, c: f64) -> Atom {
        Atom::new(AtomType::Concept, Some(name.to_string())).truth(TruthValue::simple(s, c))
    }

    fn implies(a: AtomId, b: AtomId, s: f64, c: f64) -> Atom {
        Atom::new(AtomType::Implication, None)
            .outgoing(vec![a, b])
            .truth(TruthValue::simple(s, c))
    }

    #[test]
    fn rule_names_are_stable() {
        let names: Vec<String> = InferenceRule::DEFAULT_ORDER
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["deduction", "induction", "modus_ponens", "conjunction"]);
        assert_eq!(
            serde_json::to_string(&InferenceRule::ModusPonens).unwrap(),
            "\"modus_ponens\""
        );
    }

    #[test]
    fn default_run_applies_every_rule() {
        let a = concept("A", 0.9, 0.8);
        let b = AtomId::new();
        let c = AtomId::new();
        let atoms = vec![a.clone(), implies(a.id, b, 0.9, 0.8), implies(b, c, 0.8, 0.7)];

        let mut reasoner = PlnReasoner::default();
        let results = reasoner.perform_inference(&atoms, None, None);

        let rules: Vec<InferenceRule> = results.iter().map(|r| r.rule).collect();
        assert_eq!(rules, vec![InferenceRule::Deduction, InferenceRule::ModusPonens]);
        let deduced = &results[0].derived_atoms[0];
        assert_relative_eq!(deduced.strength(), 0.72, epsilon = 1e-12);
        assert_relative_eq!(deduced.confidence(), 0.4032, epsilon = 1e-12);
        let ponens = &results[1].derived_atoms[0];
        assert_eq!(ponens.id, b);
        assert_relative_eq!(ponens.strength(), 0.81, epsilon = 1e-12);
        assert_relative_eq!(ponens.confidence(), 0.64, epsilon = 1e-12);

        let history = reasoner.inference_history();
        assert_eq!(history.len(), 1);
        let record = history.values().next().unwrap();
        assert_eq!(record.rules, InferenceRule::DEFAULT_ORDER.to_vec());
        assert_eq!(record.premise_count, 3);
        assert_eq!(record.result_count, 2);
    }

    #[test]
    fn confidence_threshold_filters_results() {
        let a = concept("A", 0.9, 0.8);
        let b = AtomId::new();
        let c = AtomId::new();
        let atoms = vec![implies(a.id, b, 0.9, 0.8), implies(b, c, 0.8, 0.7)];

        let mut reasoner = PlnReasoner::new(ReasonerConfig {
            min_confidence_threshold: 0.5,
            ..ReasonerConfig::default()
        });
        assert!(reasoner.perform_inference(&atoms, None, None).is_empty());

        let mut lenient = PlnReasoner::new(ReasonerConfig {
            min_confidence_threshold: 0.4,
            ..ReasonerConfig::default()
        });
        assert_eq!(lenient.perform_inference(&atoms, None, None).len(), 1);
    }

    #[test]
    fn cap_is_checked_between_rules() {
        let atoms: Vec<Atom> = (0..4).map(|i| concept(&format!("c{i}"), 0.9, 0.9)).collect();
        let mut reasoner = PlnReasoner::new(ReasonerConfig {
            max_inferences_per_step: 2,
            ..ReasonerConfig::default()
        });

        let rules = [InferenceRule::Conjunction, InferenceRule::Conjunction];
        let results = reasoner.perform_inference(&atoms, None, Some(&rules));
        assert_eq!(results.len(), 6);

        let record = reasoner.inference_history().values().next().unwrap();
        assert_eq!(record.rules, vec![InferenceRule::Conjunction]);
    }

    #[test]
    fn target_concepts_restrict_results() {
        let x = concept("x", 0.9, 0.9);
        let y = concept("y", 0.9, 0.9);
        let z = concept("z", 0.9, 0.9);
        let atoms = vec![x.clone(), y.clone(), z.clone()];
        let mut reasoner = PlnReasoner::default();

        let all = reasoner.perform_inference(&atoms, None, Some(&[InferenceRule::Conjunction]));
        assert_eq!(all.len(), 3);

        let targeted = reasoner.perform_inference(&atoms, Some(&[z.id]), Some(&[InferenceRule::Conjunction]));
        assert_eq!(targeted.len(), 2);
        assert!(targeted.iter().all(|r| r.premises.contains(&z.id)));

        let empty_targets = reasoner.perform_inference(&atoms, Some(&[]), Some(&[InferenceRule::Conjunction]));
        assert_eq!(empty_targets.len(), 3);
    }

    #[test]
    fn history_can_be_cleared() {
        let mut reasoner = PlnReasoner::default();
        reasoner.perform_inference(&[], None, None);
        reasoner.perform_inference(&[], None, None);
        assert_eq!(reasoner.inference_history().len(), 2);
        reasoner.clear_history();
        assert!(reasoner.inference_history().is_empty());
    }

    #[test]
    fn history_keeps_latest_records() {
        let mut reasoner = PlnReasoner::new(ReasonerConfig {
            max_history: 2,
            ..ReasonerConfig::default()
        });
        let a = concept("a", 0.9, 0.9);
        reasoner.perform_inference(&[], None, None);
        reasoner.perform_inference(&[a.clone()], None, None);
        reasoner.perform_inference(&[a.clone(), a], None, None);

        let mut counts: Vec<usize> = reasoner
            .inference_history()
            .values()
            .map(|r| r.premise_count)
            .collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn mentions_any_checks_derived_outgoing() {
        let target = AtomId::new();
        let result = InferenceResult {
            derived_atoms: vec![Atom::new(AtomType::And, None).outgoing(vec![target])],
            rule: InferenceRule::Conjunction,
            premises: vec![],
            confidence: 0.5,
            explanation: String::new(),
        };
        assert!(result.mentions_any(&[target]));
        assert!(!result.mentions_any(&[AtomId::new()]));
    }
}
