//! Engine configuration.
//!
//! Every section has a `Default` holding the documented defaults and can be
//! loaded from JSON; missing fields fall back to those defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Attention economy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Ceiling on the total outstanding STI.
    pub total_sti: f64,
    /// Ceiling on the total outstanding LTI; LTI gains past it are cut.
    pub total_lti: f64,
    /// STI at or above which an atom is in focus.
    pub focus_threshold: f64,
    /// Maximum size of the focus set.
    pub max_attention_atoms: usize,
    /// Fraction of STI lost per cycle; LTI decays ten times slower.
    pub decay_rate: f64,
    /// Multiplier applied to spread amounts.
    pub spreading_rate: f64,
    /// STI and LTI below which an atom may be forgotten.
    pub forgetting_threshold: f64,
    /// Interval of the background decay cycle, in milliseconds.
    pub cycle_interval_ms: u64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            total_sti: 10_000.0,
            total_lti: 10_000.0,
            focus_threshold: 100.0,
            max_attention_atoms: 1_000,
            decay_rate: 0.01,
            spreading_rate: 0.1,
            forgetting_threshold: 1.0,
            cycle_interval_ms: 10_000,
        }
    }
}

impl AttentionConfig {
    /// Interval of the background cycle.
    #[must_use]
    pub const fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    /// Check ranges.
    ///
    /// # Errors
    /// - `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.total_sti.is_finite() || self.total_sti <= 0.0 {
            return Err(ValidationError::config("attention.total_sti", "must be positive"));
        }
        if !self.total_lti.is_finite() || self.total_lti <= 0.0 {
            return Err(ValidationError::config("attention.total_lti", "must be positive"));
        }
        if !self.focus_threshold.is_finite() {
            return Err(ValidationError::config("attention.focus_threshold", "must be finite"));
        }
        if self.max_attention_atoms == 0 {
            return Err(ValidationError::config(
                "attention.max_attention_atoms",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.decay_rate) {
            return Err(ValidationError::config("attention.decay_rate", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.spreading_rate) {
            return Err(ValidationError::config(
                "attention.spreading_rate",
                "must be within [0, 1]",
            ));
        }
        if !self.forgetting_threshold.is_finite() {
            return Err(ValidationError::config(
                "attention.forgetting_threshold",
                "must be finite",
            ));
        }
        if self.cycle_interval_ms == 0 {
            return Err(ValidationError::config(
                "attention.cycle_interval_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// PLN reasoner parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Rules stop being applied once this many results accumulated.
    pub max_inferences_per_step: usize,
    /// Results below this confidence are discarded.
    pub min_confidence_threshold: f64,
    /// Inference records kept; the oldest is dropped past this.
    pub max_history: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            max_inferences_per_step: 100,
            min_confidence_threshold: 0.1,
            max_history: 1_000,
        }
    }
}

impl ReasonerConfig {
    /// Check ranges.
    ///
    /// # Errors
    /// - `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_inferences_per_step == 0 {
            return Err(ValidationError::config(
                "reasoner.max_inferences_per_step",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(ValidationError::config(
                "reasoner.min_confidence_threshold",
                "must be within [0, 1]",
            ));
        }
        if self.max_history == 0 {
            return Err(ValidationError::config("reasoner.max_history", "must be at least 1"));
        }
        Ok(())
    }
}

/// Persistence/vectorization hook dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Maximum queued hook jobs; extra jobs are dropped.
    pub queue_capacity: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attention bank.
    pub attention: AttentionConfig,
    /// Reasoner.
    pub reasoner: ReasonerConfig,
    /// Collaborator hooks.
    pub hooks: HookConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// - `ConfigParse`: malformed JSON or wrong field types.
    /// - `InvalidConfig`: a value outside its allowed range.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ValidationError::ConfigParse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    /// - `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.attention.validate()?;
        self.reasoner.validate()?;
        if self.hooks.queue_capacity == 0 {
            return Err(ValidationError::config("hooks.queue_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
        assert_eq!(AttentionConfig::default().cycle_interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"attention": {"focus_threshold": 50.0}}"#).unwrap();
        assert_eq!(config.attention.focus_threshold, 50.0);
        assert_eq!(config.attention.max_attention_atoms, 1_000);
        assert_eq!(config.reasoner, ReasonerConfig::default());
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{"attention": {"decay_rate": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { ref field, .. } if field == "attention.decay_rate"));
    }

    #[test]
    fn zero_history_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{"reasoner": {"max_history": 0}}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { ref field, .. } if field == "reasoner.max_history"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ValidationError::ConfigParse { .. }));
    }
}
