//! The four PLN rules as pure functions over an atom slice.
//!
//! Rules never consult the store: everything they know comes from the
//! slice, and every derived atom is returned rather than inserted.

use std::collections::HashMap;

use serde_json::json;

use crate::atom::{Atom, AtomId, AtomType, TruthValue};
use crate::reasoning::{InferenceResult, InferenceRule};

/// Modus ponens and conjunction only use premises stronger than this.
const PREMISE_STRENGTH_FLOOR: f64 = 0.5;

/// Conjunction only pairs concepts more confident than this.
const CONJUNCTION_CONFIDENCE_FLOOR: f64 = 0.3;

/// Induction needs at least this many observations of one predicate.
const INDUCTION_MIN_SUPPORT: usize = 3;

/// Induction needs the observations to average above this strength.
const INDUCTION_MIN_STRENGTH: f64 = 0.6;

/// Confidence gained per supporting observation.
const INDUCTION_CONFIDENCE_PER_SUPPORT: f64 = 0.1;

/// Induced confidence never exceeds this.
const INDUCTION_MAX_CONFIDENCE: f64 = 0.9;

fn derived(atom_type: AtomType, name: Option<String>, rule: InferenceRule) -> Atom {
    Atom::new(atom_type, name).meta("rule", json!(rule.as_str()))
}

fn result(
    rule: InferenceRule,
    atom: Atom,
    premises: Vec<AtomId>,
    explanation: String,
) -> InferenceResult {
    InferenceResult {
        confidence: atom.confidence(),
        derived_atoms: vec![atom],
        rule,
        premises,
        explanation,
    }
}

fn implications(atoms: &[Atom]) -> impl Iterator<Item = &Atom> {
    atoms
        .iter()
        .filter(|a| a.atom_type == AtomType::Implication && a.outgoing.len() >= 2)
}

/// `(A -> B)` and `(B -> C)` give `(A -> C)`.
pub(crate) fn deduction(atoms: &[Atom]) -> Vec<InferenceResult> {
    let by_id: HashMap<AtomId, &Atom> = atoms.iter().map(|a| (a.id, a)).collect();
    let label = |id: AtomId| by_id.get(&id).map_or_else(|| id.to_string(), |a| a.label());

    let mut out = Vec::new();
    for first in implications(atoms) {
        for second in implications(atoms) {
            if first.id == second.id || first.outgoing[1] != second.outgoing[0] {
                continue;
            }
            let (s1, c1) = (first.strength(), first.confidence());
            let (s2, c2) = (second.strength(), second.confidence());
            let (a, c) = (first.outgoing[0], second.outgoing[1]);

            let atom = derived(AtomType::Implication, None, InferenceRule::Deduction)
                .outgoing(vec![a, c])
                .truth(TruthValue::simple(s1 * s2, c1 * c2 * s1 * s2));
            let explanation = format!(
                "deduction: {} -> {} and {} -> {} give {} -> {}",
                label(a),
                label(first.outgoing[1]),
                label(second.outgoing[0]),
                label(c),
                label(a),
                label(c)
            );
            out.push(result(
                InferenceRule::Deduction,
                atom,
                vec![first.id, second.id],
                explanation,
            ));
        }
    }
    out
}

/// Repeated strong evaluations of one predicate give a general implication.
pub(crate) fn induction(atoms: &[Atom]) -> Vec<InferenceResult> {
    let mut order: Vec<AtomId> = Vec::new();
    let mut groups: HashMap<AtomId, Vec<&Atom>> = HashMap::new();
    for atom in atoms {
        if atom.atom_type != AtomType::Evaluation {
            continue;
        }
        let Some(&predicate) = atom.outgoing.first() else {
            continue;
        };
        groups
            .entry(predicate)
            .or_insert_with(|| {
                order.push(predicate);
                Vec::new()
            })
            .push(atom);
    }

    let mut out = Vec::new();
    for predicate in order {
        let Some(group) = groups.get(&predicate) else {
            continue;
        };
        if group.len() < INDUCTION_MIN_SUPPORT {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let support = group.len() as f64;
        let average = group.iter().map(|a| a.strength()).sum::<f64>() / support;
        if average <= INDUCTION_MIN_STRENGTH {
            continue;
        }

        let confidence = (INDUCTION_CONFIDENCE_PER_SUPPORT * support).min(INDUCTION_MAX_CONFIDENCE);
        let atom = derived(AtomType::Implication, None, InferenceRule::Induction)
            .outgoing(vec![predicate])
            .truth(TruthValue::simple(average, confidence))
            .meta("support", json!(group.len()));
        let explanation = format!(
            "induction: {} observations of {predicate} average strength {average:.3}",
            group.len()
        );
        out.push(result(
            InferenceRule::Induction,
            atom,
            group.iter().map(|a| a.id).collect(),
            explanation,
        ));
    }
    out
}

/// A strong `A` and `(A -> B)` give `B`.
pub(crate) fn modus_ponens(atoms: &[Atom]) -> Vec<InferenceResult> {
    let mut out = Vec::new();
    for implication in implications(atoms) {
        let (antecedent, consequent) = (implication.outgoing[0], implication.outgoing[1]);
        for premise in atoms.iter().filter(|a| {
            a.atom_type == AtomType::Concept
                && a.id == antecedent
                && a.strength() > PREMISE_STRENGTH_FLOOR
        }) {
            let name = atoms
                .iter()
                .find(|a| a.id == consequent)
                .and_then(|a| a.name.clone());
            let strength = implication.strength() * premise.strength();
            let confidence = implication.confidence() * premise.confidence();

            let atom = Atom::with_id(consequent, AtomType::Concept, name)
                .truth(TruthValue::simple(strength, confidence))
                .meta("rule", json!(InferenceRule::ModusPonens.as_str()));
            let explanation = format!(
                "modus ponens: {} holds and implies {}",
                premise.label(),
                atom.label()
            );
            out.push(result(
                InferenceRule::ModusPonens,
                atom,
                vec![premise.id, implication.id],
                explanation,
            ));
        }
    }
    out
}

/// Two strong, confident concepts give their conjunction.
pub(crate) fn conjunction(atoms: &[Atom]) -> Vec<InferenceResult> {
    let mut candidates: Vec<&Atom> = Vec::new();
    for atom in atoms {
        if atom.atom_type == AtomType::Concept
            && atom.strength() > PREMISE_STRENGTH_FLOOR
            && atom.confidence() > CONJUNCTION_CONFIDENCE_FLOOR
            && !candidates.iter().any(|c| c.id == atom.id)
        {
            candidates.push(atom);
        }
    }

    let mut out = Vec::new();
    for (i, first) in candidates.iter().enumerate() {
        for second in &candidates[i + 1..] {
            let atom = derived(AtomType::And, None, InferenceRule::Conjunction)
                .outgoing(vec![first.id, second.id])
                .truth(TruthValue::simple(
                    first.strength() * second.strength(),
                    first.confidence().min(second.confidence()),
                ));
            let explanation = format!(
                "conjunction: {} and {}",
                first.label(),
                second.label()
            );
            out.push(result(
                InferenceRule::Conjunction,
                atom,
                vec![first.id, second.id],
                explanation,
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn concept(name: &str, s: f64, c: f64) -> Atom {
        Atom::new(AtomType::Concept, Some(name.to_string())).truth(TruthValue::simple(s, c))
    }

    fn implies(a: AtomId, b: AtomId, s: f64, c: f64) -> Atom {
        Atom::new(AtomType::Implication, None)
            .outgoing(vec![a, b])
            .truth(TruthValue::simple(s, c))
    }

    fn evaluation(predicate: AtomId, s: f64) -> Atom {
        let subject = AtomId::new();
        Atom::new(AtomType::Evaluation, None)
            .outgoing(vec![predicate, subject])
            .truth(TruthValue::simple(s, 0.8))
    }

    #[test]
    fn deduction_chains_implications() {
        let a = concept("A", 0.9, 0.8);
        let (b, c) = (AtomId::new(), AtomId::new());
        let ab = implies(a.id, b, 0.9, 0.8);
        let bc = implies(b, c, 0.8, 0.7);

        let results = deduction(&[a.clone(), ab.clone(), bc.clone()]);
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.rule, InferenceRule::Deduction);
        assert_eq!(r.premises, vec![ab.id, bc.id]);
        let atom = &r.derived_atoms[0];
        assert_eq!(atom.atom_type, AtomType::Implication);
        assert_eq!(atom.outgoing, vec![a.id, c]);
        assert_relative_eq!(atom.strength(), 0.72);
        assert_relative_eq!(atom.confidence(), 0.4032, epsilon = 1e-12);
        assert_relative_eq!(r.confidence, 0.4032, epsilon = 1e-12);
        assert!(r.explanation.contains("A ->"));
    }

    #[test]
    fn deduction_skips_short_links() {
        let a = AtomId::new();
        let stub = Atom::new(AtomType::Implication, None).outgoing(vec![a]);
        let ab = implies(a, AtomId::new(), 0.9, 0.9);
        assert!(deduction(&[stub, ab]).is_empty());
    }

    #[test]
    fn induction_needs_support_and_strength() {
        let predicate = AtomId::new();
        let strong: Vec<Atom> = [0.7, 0.8, 0.9].iter().map(|s| evaluation(predicate, *s)).collect();
        let results = induction(&strong);
        assert_eq!(results.len(), 1);
        let atom = &results[0].derived_atoms[0];
        assert_eq!(atom.atom_type, AtomType::Implication);
        assert_eq!(atom.outgoing, vec![predicate]);
        assert_relative_eq!(atom.strength(), 0.8, epsilon = 1e-12);
        assert_relative_eq!(atom.confidence(), 0.3, epsilon = 1e-12);
        assert_eq!(results[0].premises.len(), 3);
        assert_eq!(atom.metadata["support"], json!(3));

        assert!(induction(&strong[..2]).is_empty());

        let weak: Vec<Atom> = [0.5, 0.6, 0.7].iter().map(|s| evaluation(predicate, *s)).collect();
        assert!(induction(&weak).is_empty());
    }

    #[test]
    fn induction_confidence_is_capped() {
        let predicate = AtomId::new();
        let many: Vec<Atom> = (0..12).map(|_| evaluation(predicate, 0.9)).collect();
        let results = induction(&many);
        assert_relative_eq!(results[0].confidence, 0.9);
    }

    #[test]
    fn modus_ponens_derives_consequent() {
        let a = concept("A", 0.9, 0.8);
        let b = AtomId::new();
        let ab = implies(a.id, b, 0.8, 0.7);

        let results = modus_ponens(&[a.clone(), ab.clone()]);
        assert_eq!(results.len(), 1);
        let atom = &results[0].derived_atoms[0];
        assert_eq!(atom.id, b);
        assert_eq!(atom.atom_type, AtomType::Concept);
        assert_relative_eq!(atom.strength(), 0.72, epsilon = 1e-12);
        assert_relative_eq!(atom.confidence(), 0.56, epsilon = 1e-12);
        assert_eq!(results[0].premises, vec![a.id, ab.id]);
    }

    #[test]
    fn modus_ponens_reuses_known_consequent_name() {
        let a = concept("rain", 0.9, 0.9);
        let b = concept("wet", 0.2, 0.2);
        let ab = implies(a.id, b.id, 0.9, 0.9);
        let results = modus_ponens(&[a, b.clone(), ab]);
        assert_eq!(results[0].derived_atoms[0].id, b.id);
        assert_eq!(results[0].derived_atoms[0].name.as_deref(), Some("wet"));
    }

    #[test]
    fn modus_ponens_requires_strong_antecedent() {
        let a = concept("A", 0.5, 0.9);
        let ab = implies(a.id, AtomId::new(), 0.9, 0.9);
        assert!(modus_ponens(&[a, ab]).is_empty());
    }

    #[test]
    fn conjunction_pairs_compatible_concepts() {
        let x = concept("x", 0.9, 0.8);
        let y = concept("y", 0.8, 0.4);
        let unsure = concept("unsure", 0.9, 0.3);
        let weak = concept("weak", 0.4, 0.9);

        let results = conjunction(&[x.clone(), y.clone(), unsure, weak, x.clone()]);
        assert_eq!(results.len(), 1);
        let atom = &results[0].derived_atoms[0];
        assert_eq!(atom.atom_type, AtomType::And);
        assert_eq!(atom.outgoing, vec![x.id, y.id]);
        assert_relative_eq!(atom.strength(), 0.72, epsilon = 1e-12);
        assert_relative_eq!(atom.confidence(), 0.4);
    }

    #[test]
    fn conjunction_is_quadratic_in_candidates() {
        let atoms: Vec<Atom> = (0..5).map(|i| concept(&format!("c{i}"), 0.9, 0.9)).collect();
        assert_eq!(conjunction(&atoms).len(), 10);
    }
}
