//! Declarative hypergraph patterns.
//!
//! A pattern is a tree: each node filters one atom on type, name, truth
//! value and metadata, and may constrain the atoms in its `outgoing` list
//! positionally with nested patterns. A node carrying a `variable` binds the
//! atom it matched.
//!
//! Filter operators form a closed sum type. Regular expressions are compiled
//! when the operator is built or deserialized, so an invalid expression is
//! rejected before any query runs.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atom::{Atom, AtomType, Metadata};
use crate::error::ValidationError;

const REGEX_CACHE_MAX: usize = 1024;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

fn cached_regex(pattern: &str) -> Result<Regex, ValidationError> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    if let Ok(guard) = cache.read() {
        if let Some(re) = guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let compiled = Regex::new(pattern).map_err(|e| ValidationError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    // A poisoned cache only costs recompilation.
    if let Ok(mut guard) = cache.write() {
        if guard.len() >= REGEX_CACHE_MAX {
            guard.clear();
        }
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
    }
    Ok(compiled)
}

mod regex_serde {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(re: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(re.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::cached_regex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Comparison operator with its expected operand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "value",
    rename_all = "snake_case",
    try_from = "FilterOpRepr"
)]
pub enum FilterOp {
    /// Equal (numbers compare numerically).
    Eq(Value),
    /// Not equal.
    Ne(Value),
    /// Greater than.
    Gt(Value),
    /// Greater than or equal.
    Gte(Value),
    /// Less than.
    Lt(Value),
    /// Less than or equal.
    Lte(Value),
    /// Equal to any member.
    In(Vec<Value>),
    /// String contains the substring.
    Contains(String),
    /// String matches the regular expression.
    Matches(#[serde(with = "regex_serde")] Regex),
}

/// Deserialization mirror of [`FilterOp`]; serde's adjacently tagged derive
/// cannot deserialize `Regex` through `with`, so the pattern arrives as a string.
#[derive(Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
enum FilterOpRepr {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Contains(String),
    Matches(String),
}

impl TryFrom<FilterOpRepr> for FilterOp {
    type Error = ValidationError;

    fn try_from(repr: FilterOpRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            FilterOpRepr::Eq(v) => Self::Eq(v),
            FilterOpRepr::Ne(v) => Self::Ne(v),
            FilterOpRepr::Gt(v) => Self::Gt(v),
            FilterOpRepr::Gte(v) => Self::Gte(v),
            FilterOpRepr::Lt(v) => Self::Lt(v),
            FilterOpRepr::Lte(v) => Self::Lte(v),
            FilterOpRepr::In(v) => Self::In(v),
            FilterOpRepr::Contains(v) => Self::Contains(v),
            FilterOpRepr::Matches(raw) => Self::Matches(cached_regex(&raw)?),
        })
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl FilterOp {
    /// Builds a `Matches` operator.
    ///
    /// # Errors
    /// - `InvalidRegex`: `pattern` is not a valid regular expression.
    pub fn matches(pattern: &str) -> Result<Self, ValidationError> {
        Ok(Self::Matches(cached_regex(pattern)?))
    }

    /// Evaluates the operator against an actual value.
    #[must_use]
    pub fn evaluate(&self, actual: &Value) -> bool {
        match self {
            Self::Eq(expected) => values_equal(actual, expected),
            Self::Ne(expected) => !values_equal(actual, expected),
            Self::Gt(expected) => compare(actual, expected) == Some(Ordering::Greater),
            Self::Gte(expected) => matches!(
                compare(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt(expected) => compare(actual, expected) == Some(Ordering::Less),
            Self::Lte(expected) => matches!(
                compare(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In(options) => options.iter().any(|o| values_equal(actual, o)),
            Self::Contains(needle) => actual.as_str().is_some_and(|s| s.contains(needle.as_str())),
            Self::Matches(re) => actual.as_str().is_some_and(|s| re.is_match(s)),
        }
    }
}

/// Type constraint: one type or any of several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeFilter {
    /// Exactly this type.
    One(AtomType),
    /// Any of these types.
    AnyOf(Vec<AtomType>),
}

impl TypeFilter {
    /// Returns true if `atom_type` is accepted.
    #[must_use]
    pub fn accepts(&self, atom_type: AtomType) -> bool {
        match self {
            Self::One(t) => *t == atom_type,
            Self::AnyOf(types) => types.contains(&atom_type),
        }
    }
}

/// Name constraint: exact value or an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameFilter {
    /// Exact name.
    Exact(String),
    /// Operator over the name (a missing name is `null`).
    Condition(FilterOp),
}

impl NameFilter {
    /// Returns true if the name is accepted.
    #[must_use]
    pub fn accepts(&self, name: Option<&str>) -> bool {
        match self {
            Self::Exact(expected) => name == Some(expected.as_str()),
            Self::Condition(op) => {
                let actual = name.map_or(Value::Null, |n| Value::String(n.to_string()));
                op.evaluate(&actual)
            }
        }
    }

    /// Returns true if this filter asks for exactly `name`.
    #[must_use]
    pub fn is_exact_match(&self, name: Option<&str>) -> bool {
        let Some(name) = name else {
            return false;
        };
        match self {
            Self::Exact(expected) => expected == name,
            Self::Condition(FilterOp::Eq(Value::String(expected))) => expected == name,
            Self::Condition(_) => false,
        }
    }
}

/// Per-field truth value constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TruthValueFilter {
    /// Strength constraint.
    pub strength: Option<FilterOp>,
    /// Confidence constraint.
    pub confidence: Option<FilterOp>,
    /// Evidence count constraint.
    pub count: Option<FilterOp>,
}

impl TruthValueFilter {
    /// Returns true if every present constraint holds.
    #[must_use]
    pub fn accepts(&self, atom: &Atom) -> bool {
        let tv = &atom.truth_value;
        let checks = [
            (&self.strength, Value::from(tv.strength())),
            (&self.confidence, Value::from(tv.confidence())),
            (&self.count, Value::from(tv.count())),
        ];
        checks
            .into_iter()
            .all(|(op, actual)| op.as_ref().map_or(true, |op| op.evaluate(&actual)))
    }
}

/// Query descriptor over atoms.
///
/// # Examples
///
/// ```
/// use hypergraph_cog::{AtomType, FilterOp, HypergraphPattern};
///
/// let pattern = HypergraphPattern::new()
///     .of_type(AtomType::Implication)
///     .strength(FilterOp::Gte(0.5.into()))
///     .limit(10);
/// assert_eq!(pattern.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HypergraphPattern {
    /// Type constraint.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub atom_type: Option<TypeFilter>,
    /// Name constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<NameFilter>,
    /// Truth value constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth_value: Option<TruthValueFilter>,
    /// Metadata entries that must be present with equal values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Positional patterns for the outgoing atoms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<Vec<HypergraphPattern>>,
    /// Binding name for the matched atom.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Maximum number of matches returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Matches skipped before `limit` applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl HypergraphPattern {
    /// Pattern matching every atom.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pattern from JSON.
    ///
    /// # Errors
    /// - `InvalidPattern`: malformed input, including a bad `matches` operand.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::InvalidPattern {
            message: e.to_string(),
        })
    }

    /// Require exactly this type.
    #[must_use]
    pub fn of_type(mut self, atom_type: AtomType) -> Self {
        self.atom_type = Some(TypeFilter::One(atom_type));
        self
    }

    /// Require any of these types.
    #[must_use]
    pub fn of_types(mut self, types: Vec<AtomType>) -> Self {
        self.atom_type = Some(TypeFilter::AnyOf(types));
        self
    }

    /// Require exactly this name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(NameFilter::Exact(name.into()));
        self
    }

    /// Constrain the name with an operator.
    #[must_use]
    pub fn name_where(mut self, op: FilterOp) -> Self {
        self.name = Some(NameFilter::Condition(op));
        self
    }

    /// Constrain the strength.
    #[must_use]
    pub fn strength(mut self, op: FilterOp) -> Self {
        self.truth_value.get_or_insert_with(TruthValueFilter::default).strength = Some(op);
        self
    }

    /// Constrain the confidence.
    #[must_use]
    pub fn confidence(mut self, op: FilterOp) -> Self {
        self.truth_value.get_or_insert_with(TruthValueFilter::default).confidence = Some(op);
        self
    }

    /// Constrain the evidence count.
    #[must_use]
    pub fn count(mut self, op: FilterOp) -> Self {
        self.truth_value.get_or_insert_with(TruthValueFilter::default).count = Some(op);
        self
    }

    /// Require a metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }

    /// Constrain the outgoing atoms positionally.
    #[must_use]
    pub fn outgoing(mut self, patterns: Vec<HypergraphPattern>) -> Self {
        self.outgoing = Some(patterns);
        self
    }

    /// Bind the matched atom under `name`.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    /// Limit the number of matches.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first matches.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Checks the filters that concern `atom` alone (not its outgoing atoms).
    #[must_use]
    pub fn accepts_local(&self, atom: &Atom) -> bool {
        if let Some(tf) = &self.atom_type {
            if !tf.accepts(atom.atom_type) {
                return false;
            }
        }
        if let Some(nf) = &self.name {
            if !nf.accepts(atom.name.as_deref()) {
                return false;
            }
        }
        if let Some(tvf) = &self.truth_value {
            if !tvf.accepts(atom) {
                return false;
            }
        }
        if let Some(meta) = &self.metadata {
            if !meta.iter().all(|(k, v)| atom.metadata.get(k) == Some(v)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::atom::AtomSpec;

    #[test]
    fn numeric_operators_compare_numerically() {
        assert!(FilterOp::Eq(json!(1)).evaluate(&json!(1.0)));
        assert!(FilterOp::Gt(json!(0.5)).evaluate(&json!(0.7)));
        assert!(!FilterOp::Gt(json!(0.7)).evaluate(&json!(0.7)));
        assert!(FilterOp::Gte(json!(0.7)).evaluate(&json!(0.7)));
        assert!(FilterOp::Lt(json!(3)).evaluate(&json!(2)));
        assert!(FilterOp::Lte(json!(2)).evaluate(&json!(2)));
        assert!(FilterOp::Ne(json!(2)).evaluate(&json!(3)));
        assert!(!FilterOp::Gt(json!("a")).evaluate(&json!(1)));
    }

    #[test]
    fn string_operators() {
        assert!(FilterOp::Contains("ell".to_string()).evaluate(&json!("hello")));
        assert!(!FilterOp::Contains("x".to_string()).evaluate(&json!(5)));
        assert!(FilterOp::In(vec![json!("a"), json!("b")]).evaluate(&json!("b")));
        assert!(FilterOp::Gt(json!("apple")).evaluate(&json!("banana")));

        let re = FilterOp::matches("^cat(s)?$").unwrap();
        assert!(re.evaluate(&json!("cats")));
        assert!(!re.evaluate(&json!("dog")));
    }

    #[test]
    fn invalid_regex_is_a_validation_error() {
        let err = FilterOp::matches("(unclosed").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRegex { .. }));
    }

    #[test]
    fn name_filter_handles_missing_names() {
        let exact = NameFilter::Exact("cat".to_string());
        assert!(exact.accepts(Some("cat")));
        assert!(!exact.accepts(None));
        assert!(exact.is_exact_match(Some("cat")));

        let ne = NameFilter::Condition(FilterOp::Ne(json!("cat")));
        assert!(ne.accepts(None));
        assert!(!ne.is_exact_match(Some("dog")));
    }

    #[test]
    fn pattern_deserializes_from_json() {
        let pattern = HypergraphPattern::from_json_str(
            r#"{
                "type": ["concept", "predicate"],
                "name": {"op": "matches", "value": "^c"},
                "truth_value": {"strength": {"op": "gte", "value": 0.5}},
                "variable": "x",
                "limit": 5
            }"#,
        )
        .unwrap();
        assert_eq!(
            pattern.atom_type,
            Some(TypeFilter::AnyOf(vec![AtomType::Concept, AtomType::Predicate]))
        );
        assert_eq!(pattern.variable.as_deref(), Some("x"));

        let cat = AtomSpec::concept("cat").strength(0.9).into_atom();
        let dog = AtomSpec::concept("dog").strength(0.9).into_atom();
        assert!(pattern.accepts_local(&cat));
        assert!(!pattern.accepts_local(&dog));
    }

    #[test]
    fn pattern_with_bad_regex_fails_to_parse() {
        let err = HypergraphPattern::from_json_str(r#"{"name": {"op": "matches", "value": "("}}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));
    }

    #[test]
    fn exact_name_json_is_untagged_string() {
        let pattern =
            HypergraphPattern::from_json_str(r#"{"name": "cat", "type": "concept"}"#).unwrap();
        assert!(matches!(pattern.name, Some(NameFilter::Exact(ref n)) if n == "cat"));
        assert_eq!(pattern.atom_type, Some(TypeFilter::One(AtomType::Concept)));
    }
}
