//! Feature Layout - Feature Schema Definition
//!
//! **This file controls the feature schema the model was fit on.**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment SCHEMA_VERSION
//! 2. Change order → increment SCHEMA_VERSION
//! 3. Remove feature → increment SCHEMA_VERSION
//!
//! Artifacts store the layout hash so a model can never be scored against
//! a vector built for another layout.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logic::error::{RiskError, RiskResult, ValidationError};
use super::vector::{FeatureVector, RawRecord, RawValue};

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Current credit layout version
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// CREDIT LAYOUT (Authoritative source)
// ============================================================================

/// Credit features in the exact order the reference model expects
pub const CREDIT_FEATURE_LAYOUT: &[&str] = &[
    // === Bureau (0-10) ===
    "credit_utilization",          // 0: Balance / limit, percent
    "credit_age_months",           // 1: Age of oldest account
    "hard_inquiries",              // 2: Hard pulls, last 24 months
    "payment_history_pct",         // 3: On-time payments, percent
    "late_30_days",                // 4
    "late_60_days",                // 5
    "late_90_days",                // 6
    "num_credit_accounts",         // 7
    "total_credit_limit",          // 8
    "current_balance",             // 9
    "monthly_income",              // 10

    // === Spending mix, percent of income (11-21) ===
    "spending_groceries_pct",      // 11
    "spending_dining_pct",         // 12
    "spending_entertainment_pct",  // 13
    "spending_utilities_pct",      // 14
    "spending_transportation_pct", // 15
    "spending_shopping_pct",       // 16
    "spending_healthcare_pct",     // 17
    "spending_travel_pct",         // 18
    "spending_subscriptions_pct",  // 19
    "spending_miscellaneous_pct",  // 20
    "total_spending_pct",          // 21

    // === Behaviour (22-29) ===
    "spending_velocity",           // 22: Spend per day
    "impulse_spending_score",      // 23: 0-100
    "recurring_payment_ratio",     // 24
    "onetime_payment_ratio",       // 25
    "payment_consistency",         // 26: 0-100
    "payment_timing_variance",     // 27: Days
    "min_payment_frequency",       // 28: Percent of minimum-only payments
    "avg_days_before_due",         // 29: Negative = paid late
];

/// Number of credit features
pub const CREDIT_FEATURE_COUNT: usize = 30;

static CREDIT_SCHEMA: Lazy<FeatureSchema> = Lazy::new(|| {
    FeatureSchema::from_static(SCHEMA_VERSION, CREDIT_FEATURE_LAYOUT)
});

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

/// Ordered, named feature set a model was fit on
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    version: u8,
    names: Arc<[String]>,
    index: HashMap<String, usize>,
    hash: u32,
}

impl FeatureSchema {
    /// Build a schema; rejects empty and duplicate names
    pub fn new<S: AsRef<str>>(version: u8, names: &[S]) -> RiskResult<Self> {
        if names.is_empty() {
            return Err(RiskError::CorruptArtifact("feature schema is empty".to_string()));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if name.trim().is_empty() {
                return Err(RiskError::CorruptArtifact(format!("feature {} has an empty name", i)));
            }
            if index.insert(name.to_string(), i).is_some() {
                return Err(RiskError::CorruptArtifact(format!("duplicate feature '{}'", name)));
            }
        }

        let names: Arc<[String]> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let hash = compute_layout_hash(version, &names);

        Ok(Self { version, names, index, hash })
    }

    fn from_static(version: u8, names: &[&str]) -> Self {
        let names: Arc<[String]> = names.iter().map(|n| n.to_string()).collect();
        let index = names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
        let hash = compute_layout_hash(version, &names);
        Self { version, names, index, hash }
    }

    /// The 30-feature credit layout
    pub fn credit_default() -> Self {
        CREDIT_SCHEMA.clone()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn layout_hash(&self) -> u32 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn shared_names(&self) -> Arc<[String]> {
        Arc::clone(&self.names)
    }

    /// Get feature index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Get feature name by index
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            version: self.version,
            hash: self.hash,
            feature_count: self.len(),
            feature_names: self.names.to_vec(),
        }
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Validate a raw record and align it to canonical order.
    ///
    /// Missing and unknown keys are reported in full; extras are never dropped.
    pub fn validate(&self, record: &RawRecord) -> Result<FeatureVector, ValidationError> {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|name| !record.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFeatures(missing));
        }

        let unknown: Vec<String> = record
            .keys()
            .filter(|key| !self.contains(key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownFeatures(unknown));
        }

        let mut values = Vec::with_capacity(self.len());
        for name in self.names.iter() {
            let raw = &record[name.as_str()];
            let value = raw.as_number().ok_or_else(|| ValidationError::InvalidType {
                feature: name.clone(),
                found: raw.type_name().to_string(),
            })?;
            if !value.is_finite() {
                return Err(ValidationError::InvalidValue {
                    feature: name.clone(),
                    value,
                });
            }
            values.push(value);
        }

        Ok(FeatureVector::from_parts(self, values))
    }

    /// Validate a JSON object (convenience for API boundaries)
    pub fn validate_json(&self, value: &serde_json::Value) -> Result<FeatureVector, ValidationError> {
        let object = value.as_object().ok_or_else(|| ValidationError::InvalidType {
            feature: "<record>".to_string(),
            found: "non-object".to_string(),
        })?;

        let record: RawRecord = object
            .iter()
            .map(|(k, v)| (k.clone(), RawValue::from(v)))
            .collect();

        self.validate(&record)
    }

    /// Check that `expected` names the same feature set.
    ///
    /// Order may differ: vectors are always aligned to this schema.
    pub fn reconcile(&self, expected: &FeatureSchema) -> RiskResult<()> {
        if self.hash == expected.hash {
            return Ok(());
        }

        let ours: BTreeSet<&str> = self.names.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = expected.names.iter().map(String::as_str).collect();

        let missing: Vec<String> = theirs.difference(&ours).map(|s| s.to_string()).collect();
        let unexpected: Vec<String> = ours.difference(&theirs).map(|s| s.to_string()).collect();

        if missing.is_empty() && unexpected.is_empty() {
            log::info!("Schema order differs from expectation; aligning to model order");
            return Ok(());
        }

        Err(RiskError::SchemaMismatch { missing, unexpected })
    }
}

impl PartialEq for FeatureSchema {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.names == other.names
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over version and ordered names
pub fn compute_layout_hash(version: u8, names: &[String]) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[version]);

    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

// ============================================================================
// TESTS
// ============================================================================
