//! Inference Engine - Tree Ensemble Scoring
//!
//! A `RiskModel` is immutable once built. Callers share it through
//! `Arc`; swapping models goes through `ModelSlot`.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::{FeatureSchema, FeatureVector, RawRecord};
use super::threshold::{logit, RiskPrediction};
use super::tree::{Node, Tree};

// ============================================================================
// IDENTITY & METADATA
// ============================================================================

/// Per-instance model identity (new on every construction or load)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(Uuid);

impl ModelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive metadata carried in the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ModelMetadata {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now(),
            description: None,
        }
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Gradient-boosted binary classifier over a feature schema
#[derive(Debug)]
pub struct RiskModel {
    id: ModelId,
    schema: FeatureSchema,
    trees: Vec<Tree>,
    /// Prior probability; the ensemble starts from its logit
    base_score: f64,
    metadata: ModelMetadata,
    fingerprint: String,
}

impl RiskModel {
    /// Build and validate a model; every structural defect is `CorruptArtifact`
    pub fn new(
        schema: FeatureSchema,
        trees: Vec<Tree>,
        base_score: f64,
        metadata: ModelMetadata,
    ) -> RiskResult<Self> {
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(RiskError::CorruptArtifact(format!(
                "base_score must be in (0, 1), got {}",
                base_score
            )));
        }
        if trees.is_empty() {
            return Err(RiskError::CorruptArtifact("model has no trees".to_string()));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(schema.len())
                .map_err(|reason| RiskError::CorruptArtifact(format!("tree {}: {}", i, reason)))?;
        }

        let fingerprint = content_fingerprint(&schema, &trees, base_score);

        Ok(Self {
            id: ModelId::new(),
            schema,
            trees,
            base_score,
            metadata,
            fingerprint,
        })
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Ensemble starting point in margin space
    pub fn base_margin(&self) -> f64 {
        logit(self.base_score)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// SHA-256 over schema, base score and trees (stable across save/load)
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    // ========================================================================
    // SCORING
    // ========================================================================

    /// Values in this model's feature order.
    ///
    /// Vectors from a schema with the same feature set in another order are
    /// realigned by name; anything else is `SchemaMismatch`.
    pub(crate) fn aligned_values<'a>(&self, vector: &'a FeatureVector) -> RiskResult<Cow<'a, [f64]>> {
        if vector.is_compatible(&self.schema) {
            return Ok(Cow::Borrowed(vector.values()));
        }

        let other = FeatureSchema::new(0, vector.names())?;
        self.schema.reconcile(&other)?;

        let mut values = Vec::with_capacity(self.schema.len());
        for name in self.schema.names() {
            match vector.get(name) {
                Some(v) => values.push(v),
                None => {
                    return Err(RiskError::SchemaMismatch {
                        missing: vec![name.clone()],
                        unexpected: Vec::new(),
                    })
                }
            }
        }
        Ok(Cow::Owned(values))
    }

    pub(crate) fn margin_of(&self, values: &[f64]) -> f64 {
        self.base_margin() + self.trees.iter().map(|t| t.predict(values)).sum::<f64>()
    }

    /// Raw ensemble output (log-odds)
    pub fn predict_margin(&self, vector: &FeatureVector) -> RiskResult<f64> {
        let values = self.aligned_values(vector)?;
        Ok(self.margin_of(&values))
    }

    pub fn predict(&self, vector: &FeatureVector) -> RiskResult<RiskPrediction> {
        Ok(RiskPrediction::from_margin(self.predict_margin(vector)?))
    }

    /// Validate against the model schema, then score
    pub fn predict_record(&self, record: &RawRecord) -> RiskResult<RiskPrediction> {
        let vector = self.schema.validate(record)?;
        self.predict(&vector)
    }

    /// Score records independently; one bad record never fails the batch
    pub fn predict_batch(&self, records: &[RawRecord]) -> Vec<RiskResult<RiskPrediction>> {
        let results: Vec<RiskResult<RiskPrediction>> =
            records.iter().map(|record| self.predict_record(record)).collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            log::warn!(
                "Batch scored: {} ok, {} failed (model {})",
                results.len() - failed,
                failed,
                self.id
            );
        } else {
            log::debug!("Batch scored: {} ok (model {})", results.len(), self.id);
        }

        results
    }
}

/// Content hash of everything that affects predictions
fn content_fingerprint(schema: &FeatureSchema, trees: &[Tree], base_score: f64) -> String {
    let mut hasher = Sha256::new();

    for name in schema.names() {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(base_score.to_le_bytes());

    for tree in trees {
        hasher.update((tree.len() as u64).to_le_bytes());
        for node in tree.nodes() {
            match node {
                Node::Split { feature, threshold, left, right, cover, gain } => {
                    hasher.update([1u8]);
                    hasher.update((*feature as u64).to_le_bytes());
                    hasher.update(threshold.to_le_bytes());
                    hasher.update((*left as u64).to_le_bytes());
                    hasher.update((*right as u64).to_le_bytes());
                    hasher.update(cover.to_le_bytes());
                    hasher.update(gain.to_le_bytes());
                }
                Node::Leaf { value, cover } => {
                    hasher.update([2u8]);
                    hasher.update(value.to_le_bytes());
                    hasher.update(cover.to_le_bytes());
                }
            }
        }
    }

    hex::encode(hasher.finalize())
}

// ============================================================================
// MODEL SLOT
// ============================================================================

/// Shared holder for the active model
#[derive(Debug, Default)]
pub struct ModelSlot {
    current: RwLock<Option<Arc<RiskModel>>>,
}

impl ModelSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: Arc<RiskModel>) -> Self {
        Self {
            current: RwLock::new(Some(model)),
        }
    }

    /// Active model, or `ModelNotLoaded`
    pub fn current(&self) -> RiskResult<Arc<RiskModel>> {
        self.current.read().clone().ok_or(RiskError::ModelNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Install `model`, returning the previous one
    pub fn replace(&self, model: Arc<RiskModel>) -> Option<Arc<RiskModel>> {
        log::info!(
            "Model installed: {} ({} trees, fingerprint {})",
            model.id(),
            model.n_trees(),
            &model.fingerprint()[..12]
        );
        self.current.write().replace(model)
    }

    pub fn clear(&self) -> Option<Arc<RiskModel>> {
        self.current.write().take()
    }
}
