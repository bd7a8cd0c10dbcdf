//! Feature Vector - Core data structure for model input
//!
//! A `FeatureVector` only exists after schema validation, so every vector
//! is complete, finite and aligned to the schema it was validated against.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logic::error::ValidationError;
use super::layout::FeatureSchema;

// ============================================================================
// RAW INPUT
// ============================================================================

/// Untyped value as received at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Flag(bool),
    Null,
}

impl RawValue {
    /// Numeric view; text, flags and null are not numeric
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Text(_) => "string",
            RawValue::Flag(_) => "bool",
            RawValue::Null => "null",
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Flag(value)
    }
}

impl From<&serde_json::Value> for RawValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                None => n.as_f64().map(RawValue::Float).unwrap_or(RawValue::Null),
            },
            serde_json::Value::String(s) => RawValue::Text(s.clone()),
            serde_json::Value::Bool(b) => RawValue::Flag(*b),
            serde_json::Value::Null => RawValue::Null,
            // Arrays / objects are reported as text for the type error
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// Feature name → raw value, as received from callers
pub type RawRecord = BTreeMap<String, RawValue>;

/// Build a record from numeric pairs
pub fn record_from_pairs<S: AsRef<str>>(pairs: &[(S, f64)]) -> RawRecord {
    pairs
        .iter()
        .map(|(name, value)| (name.as_ref().to_string(), RawValue::Float(*value)))
        .collect()
}

// ============================================================================
// VALIDATED FEATURE VECTOR
// ============================================================================

/// Schema-aligned feature values
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVector {
    /// CRC32 of the layout this vector is aligned to
    layout_hash: u32,
    /// Feature names in layout order (shared with the schema)
    names: Arc<[String]>,
    /// Feature values in layout order
    values: Vec<f64>,
}

impl FeatureVector {
    pub(crate) fn from_parts(schema: &FeatureSchema, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), schema.len());
        Self {
            layout_hash: schema.layout_hash(),
            names: schema.shared_names(),
            values,
        }
    }

    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in layout order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Get feature by index
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.value_at(i))
    }

    /// (name, value) pairs in layout order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Check the vector was built for `schema`
    pub fn is_compatible(&self, schema: &FeatureSchema) -> bool {
        self.layout_hash == schema.layout_hash()
    }

    /// Overlay changes onto a copy of this vector.
    ///
    /// Every changed name must exist and every value must be finite.
    pub fn with_overrides(&self, changes: &BTreeMap<String, f64>) -> Result<FeatureVector, ValidationError> {
        let unknown: Vec<String> = changes
            .keys()
            .filter(|name| !self.names.iter().any(|n| n == *name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownFeatures(unknown));
        }

        let mut values = self.values.clone();
        for (name, value) in changes {
            if !value.is_finite() {
                return Err(ValidationError::InvalidValue {
                    feature: name.clone(),
                    value: *value,
                });
            }
            if let Some(i) = self.names.iter().position(|n| n == name) {
                values[i] = *value;
            }
        }

        Ok(Self {
            layout_hash: self.layout_hash,
            names: Arc::clone(&self.names),
            values,
        })
    }

    /// Back to a raw record (e.g. to re-run validation)
    pub fn to_record(&self) -> RawRecord {
        self.iter()
            .map(|(name, value)| (name.to_string(), RawValue::Float(value)))
            .collect()
    }

    /// Named values for logging / prompts
    pub fn to_named_map(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(name, value)| (name.to_string(), value)).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
