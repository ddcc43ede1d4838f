//! Economic attention allocation.
//!
//! The [`AttentionBank`] keeps short-, long- and very-long-term importance
//! per atom id in its own map, independent of the atom store. It is the
//! single authoritative location for attention state; the store never tracks
//! importance.
//!
//! Total outstanding STI is capped. Allocations that push the total over
//! the ceiling are absorbed by skimming STI from the least important atoms.
//! Atoms whose STI reaches the focus threshold form the bounded focus set.

mod cycle;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::atom::AtomId;
use crate::config::AttentionConfig;

pub use cycle::AttentionCycle;

/// Lower bound of STI and LTI.
pub const IMPORTANCE_MIN: f64 = -1000.0;

/// Upper bound of STI and LTI.
pub const IMPORTANCE_MAX: f64 = 1000.0;

/// VLTI below which an atom is not protected from forgetting.
pub const VLTI_PROTECTION: f64 = 0.1;

/// Largest STI gain from a single stimulus.
pub const MAX_STIMULUS: f64 = 100.0;

/// Fraction of an atom's STI that one redistribution pass may skim.
const REDISTRIBUTION_SKIM: f64 = 0.1;

/// Upper bound on redistribution passes over the positive-STI atoms.
const MAX_REDISTRIBUTION_PASSES: usize = 1_000;

/// LTI decays this many times slower than STI.
const LTI_DECAY_FACTOR: f64 = 0.1;

fn clamp_importance(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(IMPORTANCE_MIN, IMPORTANCE_MAX)
}

fn clamp_vlti(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Importance of one atom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttentionValue {
    /// Short-term importance, `[-1000, 1000]`.
    pub sti: f64,
    /// Long-term importance, `[-1000, 1000]`.
    pub lti: f64,
    /// Very-long-term importance, `[0, 1]`. Never decays.
    pub vlti: f64,
}

/// STI histogram split at zero and the focus threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StiDistribution {
    /// `sti >= focus_threshold`.
    pub high: usize,
    /// `0 <= sti < focus_threshold`.
    pub medium: usize,
    /// `sti < 0`.
    pub low: usize,
}

/// Snapshot of the attention economy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionStatistics {
    /// Atoms with an attention value.
    pub total_atoms: usize,
    /// Size of the focus set.
    pub focus_size: usize,
    /// Outstanding STI.
    pub total_sti_allocated: f64,
    /// Outstanding LTI.
    pub total_lti_allocated: f64,
    /// Mean STI (0 when empty).
    pub average_sti: f64,
    /// Mean LTI (0 when empty).
    pub average_lti: f64,
    /// STI histogram.
    pub distribution: StiDistribution,
}

/// Outcome of one decay and forgetting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Atoms whose importance was decayed.
    pub decayed: usize,
    /// Atoms dropped from the bank.
    pub forgotten: Vec<AtomId>,
}

/// Attention economy keyed by atom id.
#[derive(Debug, Clone)]
pub struct AttentionBank {
    config: AttentionConfig,
    values: HashMap<AtomId, AttentionValue>,
    focus: HashSet<AtomId>,
    total_sti_allocated: f64,
    total_lti_allocated: f64,
}

impl Default for AttentionBank {
    fn default() -> Self {
        Self::new(AttentionConfig::default())
    }
}

impl AttentionBank {
    /// Create an empty bank.
    #[must_use]
    pub fn new(config: AttentionConfig) -> Self {
        Self {
            config,
            values: HashMap::new(),
            focus: HashSet::new(),
            total_sti_allocated: 0.0,
            total_lti_allocated: 0.0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// Add deltas to an atom's importance, creating its value on first use.
    ///
    /// STI and LTI are clamped to `[-1000, 1000]`, VLTI to `[0, 1]`. The
    /// outstanding totals move by the net change. A positive LTI delta is cut
    /// to the headroom left under `total_lti`. If the STI total exceeds the
    /// ceiling, the excess is skimmed from the lowest positive-STI atoms.
    pub fn allocate_attention(
        &mut self,
        atom_id: AtomId,
        sti_delta: f64,
        lti_delta: f64,
        vlti_delta: f64,
    ) -> AttentionValue {
        let current = self.values.get(&atom_id).copied().unwrap_or_default();
        let lti_delta = if lti_delta > 0.0 {
            lti_delta.min((self.config.total_lti - self.total_lti_allocated).max(0.0))
        } else {
            lti_delta
        };
        let next = AttentionValue {
            sti: clamp_importance(current.sti + sti_delta),
            lti: clamp_importance(current.lti + lti_delta),
            vlti: clamp_vlti(current.vlti + vlti_delta),
        };

        self.total_sti_allocated += next.sti - current.sti;
        self.total_lti_allocated += next.lti - current.lti;
        self.values.insert(atom_id, next);

        if self.total_sti_allocated > self.config.total_sti {
            for skimmed in self.redistribute() {
                self.refresh_focus(skimmed);
            }
        }
        self.refresh_focus(atom_id);
        self.enforce_focus_cap();

        self.values.get(&atom_id).copied().unwrap_or(next)
    }

    /// Move a share of the source's STI evenly onto the targets.
    ///
    /// The amount is `sti * spread_factor * spreading_rate`. Returns the amount
    /// moved; nothing happens for a non-positive source or no targets.
    pub fn spread_attention(&mut self, source: AtomId, targets: &[AtomId], spread_factor: f64) -> f64 {
        let source_sti = self.values.get(&source).map_or(0.0, |v| v.sti);
        if source_sti <= 0.0 || targets.is_empty() {
            return 0.0;
        }

        let amount = source_sti * spread_factor * self.config.spreading_rate;
        if amount <= 0.0 || !amount.is_finite() {
            return 0.0;
        }
        self.allocate_attention(source, -amount, 0.0, 0.0);

        #[allow(clippy::cast_precision_loss)]
        let share = amount / targets.len() as f64;
        for target in targets {
            self.allocate_attention(*target, share, 0.0, 0.0);
        }
        tracing::trace!(%source, amount, targets = targets.len(), "spread attention");
        amount
    }

    /// Raise STI by `min(100, stimulus * 10)`.
    pub fn stimulate(&mut self, atom_id: AtomId, stimulus: f64) -> AttentionValue {
        let gain = (stimulus * 10.0).min(MAX_STIMULUS);
        self.allocate_attention(atom_id, gain, 0.0, 0.0)
    }

    /// Shift LTI by `(importance - 0.5) * 200` with `importance` in `[0, 1]`.
    pub fn update_importance(&mut self, atom_id: AtomId, importance: f64) -> AttentionValue {
        let importance = clamp_vlti(importance);
        self.allocate_attention(atom_id, 0.0, (importance - 0.5) * 200.0, 0.0)
    }

    /// Drop every atom whose STI and LTI are below the forgetting threshold
    /// and whose VLTI does not protect it. The atom store is not touched.
    pub fn forget_low_attention_atoms(&mut self) -> Vec<AtomId> {
        let threshold = self.config.forgetting_threshold;
        let mut forgotten: Vec<AtomId> = self
            .values
            .iter()
            .filter(|(_, v)| v.sti < threshold && v.lti < threshold && v.vlti < VLTI_PROTECTION)
            .map(|(id, _)| *id)
            .collect();
        forgotten.sort();

        for id in &forgotten {
            self.remove_attention(*id);
        }
        if !forgotten.is_empty() {
            tracing::debug!(count = forgotten.len(), "forgot low-attention atoms");
        }
        forgotten
    }

    /// Decay every atom once, then forget.
    ///
    /// STI loses `sti * decay_rate`, LTI ten times less; both are floored at
    /// zero. VLTI is untouched.
    pub fn run_cycle(&mut self) -> CycleReport {
        let rate = self.config.decay_rate;
        let mut sti_change = 0.0;
        let mut lti_change = 0.0;

        for value in self.values.values_mut() {
            let sti = (value.sti - value.sti * rate).max(0.0);
            let lti = (value.lti - value.lti * rate * LTI_DECAY_FACTOR).max(0.0);
            sti_change += sti - value.sti;
            lti_change += lti - value.lti;
            value.sti = sti;
            value.lti = lti;
        }
        self.total_sti_allocated += sti_change;
        self.total_lti_allocated += lti_change;

        let threshold = self.config.focus_threshold;
        let values = &self.values;
        self.focus
            .retain(|id| values.get(id).is_some_and(|v| v.sti >= threshold));

        let decayed = self.values.len();
        let forgotten = self.forget_low_attention_atoms();
        tracing::debug!(decayed, forgotten = forgotten.len(), "attention cycle complete");
        CycleReport { decayed, forgotten }
    }

    /// Remove an atom's attention value, e.g. after it was deleted from the store.
    pub fn remove_attention(&mut self, atom_id: AtomId) -> Option<AttentionValue> {
        let value = self.values.remove(&atom_id)?;
        self.focus.remove(&atom_id);
        self.total_sti_allocated -= value.sti;
        self.total_lti_allocated -= value.lti;
        Some(value)
    }

    /// Returns the attention value of an atom.
    #[must_use]
    pub fn get_attention(&self, atom_id: AtomId) -> Option<AttentionValue> {
        self.values.get(&atom_id).copied()
    }

    /// Returns true if the atom is in the focus set.
    #[must_use]
    pub fn is_in_focus(&self, atom_id: AtomId) -> bool {
        self.focus.contains(&atom_id)
    }

    /// Focus set, highest STI first.
    #[must_use]
    pub fn get_focused_atoms(&self) -> Vec<AtomId> {
        let mut focused: Vec<(AtomId, f64)> = self
            .focus
            .iter()
            .map(|id| (*id, self.values.get(id).map_or(0.0, |v| v.sti)))
            .collect();
        focused.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        focused.into_iter().map(|(id, _)| id).collect()
    }

    /// The `limit` atoms with the highest STI.
    #[must_use]
    pub fn get_top_attention_atoms(&self, limit: usize) -> Vec<(AtomId, AttentionValue)> {
        let mut all: Vec<(AtomId, AttentionValue)> =
            self.values.iter().map(|(id, v)| (*id, *v)).collect();
        all.sort_by(|a, b| b.1.sti.total_cmp(&a.1.sti).then_with(|| a.0.cmp(&b.0)));
        all.truncate(limit);
        all
    }

    /// Counts, averages and the STI histogram.
    #[must_use]
    pub fn get_statistics(&self) -> AttentionStatistics {
        let threshold = self.config.focus_threshold;
        let mut distribution = StiDistribution::default();
        let mut sti_sum = 0.0;
        let mut lti_sum = 0.0;
        for v in self.values.values() {
            sti_sum += v.sti;
            lti_sum += v.lti;
            if v.sti >= threshold {
                distribution.high += 1;
            } else if v.sti >= 0.0 {
                distribution.medium += 1;
            } else {
                distribution.low += 1;
            }
        }

        let n = self.values.len();
        #[allow(clippy::cast_precision_loss)]
        let (average_sti, average_lti) = if n == 0 {
            (0.0, 0.0)
        } else {
            (sti_sum / n as f64, lti_sum / n as f64)
        };

        AttentionStatistics {
            total_atoms: n,
            focus_size: self.focus.len(),
            total_sti_allocated: self.total_sti_allocated,
            total_lti_allocated: self.total_lti_allocated,
            average_sti,
            average_lti,
            distribution,
        }
    }

    /// Outstanding STI.
    #[must_use]
    pub const fn total_sti_allocated(&self) -> f64 {
        self.total_sti_allocated
    }

    /// Outstanding LTI.
    #[must_use]
    pub const fn total_lti_allocated(&self) -> f64 {
        self.total_lti_allocated
    }

    /// Atoms with an attention value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no atom has attention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Skim STI from positive atoms, lowest first, until the total fits the ceiling.
    fn redistribute(&mut self) -> HashSet<AtomId> {
        let mut excess = self.total_sti_allocated - self.config.total_sti;
        let mut touched = HashSet::new();
        let mut passes = 0;

        while excess > 0.0 && passes < MAX_REDISTRIBUTION_PASSES {
            let mut candidates: Vec<(AtomId, f64)> = self
                .values
                .iter()
                .filter(|(_, v)| v.sti > 0.0)
                .map(|(id, v)| (*id, v.sti))
                .collect();
            candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

            let mut skimmed = false;
            for (id, sti) in candidates {
                let take = (sti * REDISTRIBUTION_SKIM).min(excess);
                if take <= 0.0 {
                    continue;
                }
                if let Some(value) = self.values.get_mut(&id) {
                    value.sti -= take;
                    self.total_sti_allocated -= take;
                    excess -= take;
                    skimmed = true;
                    touched.insert(id);
                }
                if excess <= 0.0 {
                    break;
                }
            }

            if !skimmed {
                break;
            }
            passes += 1;
        }

        tracing::debug!(
            passes,
            atoms = touched.len(),
            total = self.total_sti_allocated,
            "redistributed STI over budget"
        );
        touched
    }

    fn refresh_focus(&mut self, atom_id: AtomId) {
        let in_focus = self
            .values
            .get(&atom_id)
            .is_some_and(|v| v.sti >= self.config.focus_threshold);
        if in_focus {
            self.focus.insert(atom_id);
        } else {
            self.focus.remove(&atom_id);
        }
    }

    fn enforce_focus_cap(&mut self) {
        let cap = self.config.max_attention_atoms;
        if self.focus.len() <= cap {
            return;
        }

        let mut members: Vec<(AtomId, f64)> = self
            .focus
            .iter()
            .map(|id| (*id, self.values.get(id).map_or(0.0, |v| v.sti)))
            .collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let overflow = members.len() - cap;
        for (id, _) in members.into_iter().take(overflow) {
            self.focus.remove(&id);
        }
        tracing::debug!(evicted = overflow, "focus set over capacity");
    }
}
