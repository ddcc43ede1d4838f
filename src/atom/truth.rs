//! Probabilistic truth values.
//!
//! A truth value is a `(strength, confidence, count)` triple. Strength and
//! confidence always live in `[0, 1]`; the evidence count only grows through
//! revision.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default strength for atoms created without an explicit value.
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// Default confidence for atoms created without an explicit value.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Default evidence count.
pub const DEFAULT_COUNT: u64 = 1;

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Strength, confidence and evidence count of an atom.
///
/// # Examples
///
/// ```
/// use hypergraph_cog::TruthValue;
///
/// let tv = TruthValue::new(1.4, -0.2, 3);
/// assert_eq!(tv.strength(), 1.0);
/// assert_eq!(tv.confidence(), 0.0);
/// assert_eq!(tv.count(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTruthValue")]
pub struct TruthValue {
    strength: f64,
    confidence: f64,
    count: u64,
}

/// Wire form of [`TruthValue`], clamped on the way in.
#[derive(Deserialize)]
struct RawTruthValue {
    strength: f64,
    confidence: f64,
    count: u64,
}

impl From<RawTruthValue> for TruthValue {
    fn from(raw: RawTruthValue) -> Self {
        Self::new(raw.strength, raw.confidence, raw.count)
    }
}

impl TruthValue {
    /// Creates a truth value, clamping strength and confidence to `[0, 1]`.
    #[must_use]
    pub fn new(strength: f64, confidence: f64, count: u64) -> Self {
        Self {
            strength: clamp_unit(strength),
            confidence: clamp_unit(confidence),
            count,
        }
    }

    /// Creates a truth value with the default evidence count.
    #[must_use]
    pub fn simple(strength: f64, confidence: f64) -> Self {
        Self::new(strength, confidence, DEFAULT_COUNT)
    }

    /// Returns the strength.
    #[must_use]
    pub const fn strength(&self) -> f64 {
        self.strength
    }

    /// Returns the confidence.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the evidence count.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Count-weighted revision of two truth values.
    ///
    /// The counts add up, strength and confidence become evidence-weighted
    /// averages. Two zero-count values fall back to a plain average.
    #[must_use]
    pub fn revise(&self, other: &Self) -> Self {
        let total = self.count.saturating_add(other.count);
        if total == 0 {
            return Self::new(
                (self.strength + other.strength) / 2.0,
                ((self.confidence + other.confidence) / 2.0).min(1.0),
                0,
            );
        }

        #[allow(clippy::cast_precision_loss)]
        let (w1, w2, wt) = (self.count as f64, other.count as f64, total as f64);
        let strength = (self.strength * w1 + other.strength * w2) / wt;
        let confidence = ((self.confidence * w1 + other.confidence * w2) / wt).min(1.0);
        Self::new(strength, confidence, total)
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self::new(DEFAULT_STRENGTH, DEFAULT_CONFIDENCE, DEFAULT_COUNT)
    }
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<s={:.3}, c={:.3}, n={}>",
            self.strength, self.confidence, self.count
        )
    }
}

/// Partially specified truth value; missing fields take the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthValuePatch {
    /// Strength override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    /// Confidence override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Evidence count override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl TruthValuePatch {
    /// Resolves the patch against the defaults.
    #[must_use]
    pub fn resolve(&self) -> TruthValue {
        TruthValue::new(
            self.strength.unwrap_or(DEFAULT_STRENGTH),
            self.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            self.count.unwrap_or(DEFAULT_COUNT),
        )
    }
}

impl From<TruthValue> for TruthValuePatch {
    fn from(tv: TruthValue) -> Self {
        Self {
            strength: Some(tv.strength),
            confidence: Some(tv.confidence),
            count: Some(tv.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn new_clamps_and_rejects_nan() {
        let tv = TruthValue::new(f64::NAN, 2.0, 0);
        assert_eq!(tv.strength(), 0.0);
        assert_eq!(tv.confidence(), 1.0);
        assert_eq!(tv.count(), 0);
    }

    #[test]
    fn revise_weights_by_count() {
        let a = TruthValue::new(0.9, 0.8, 3);
        let b = TruthValue::new(0.1, 0.4, 1);
        let merged = a.revise(&b);
        assert_eq!(merged.count(), 4);
        assert_relative_eq!(merged.strength(), (0.9 * 3.0 + 0.1) / 4.0);
        assert_relative_eq!(merged.confidence(), (0.8 * 3.0 + 0.4) / 4.0);
    }

    #[test]
    fn revise_of_identical_values_keeps_them() {
        let a = TruthValue::new(0.7, 0.6, 2);
        let merged = a.revise(&a);
        assert_eq!(merged.count(), 4);
        assert_relative_eq!(merged.strength(), 0.7);
        assert_relative_eq!(merged.confidence(), 0.6);
    }

    #[test]
    fn revise_zero_counts_averages() {
        let a = TruthValue::new(0.2, 0.2, 0);
        let b = TruthValue::new(0.6, 0.4, 0);
        let merged = a.revise(&b);
        assert_eq!(merged.count(), 0);
        assert_relative_eq!(merged.strength(), 0.4);
        assert_relative_eq!(merged.confidence(), 0.3);
    }

    #[test]
    fn deserialize_clamps_out_of_range_values() {
        let tv: TruthValue =
            serde_json::from_str(r#"{"strength":7.5,"confidence":-3.0,"count":1}"#).unwrap();
        assert_eq!(tv.strength(), 1.0);
        assert_eq!(tv.confidence(), 0.0);
        assert_eq!(tv.count(), 1);

        let round: TruthValue =
            serde_json::from_str(&serde_json::to_string(&TruthValue::new(0.3, 0.7, 4)).unwrap())
                .unwrap();
        assert_eq!(round, TruthValue::new(0.3, 0.7, 4));
    }

    #[test]
    fn patch_fills_defaults() {
        let tv = TruthValuePatch {
            strength: Some(0.9),
            ..TruthValuePatch::default()
        }
        .resolve();
        assert_relative_eq!(tv.strength(), 0.9);
        assert_relative_eq!(tv.confidence(), DEFAULT_CONFIDENCE);
        assert_eq!(tv.count(), DEFAULT_COUNT);
    }
}
