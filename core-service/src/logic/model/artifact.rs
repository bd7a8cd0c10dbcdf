//! Model Artifact - Persisted ensemble
//!
//! On-disk format is a JSON envelope:
//! `{ format, format_version, payload, checksum }` where `checksum` is the
//! SHA-256 (hex) of the serialized payload. Loading never trusts the file:
//! format, checksum, layout hash and tree structure are all re-checked.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::{compute_layout_hash, FeatureSchema};
use super::inference::{ModelMetadata, RiskModel};
use super::tree::Tree;

pub const ARTIFACT_FORMAT: &str = "credit-risk-tree-ensemble";
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    format: String,
    format_version: u32,
    payload: serde_json::Value,
    checksum: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelPayload {
    schema_version: u8,
    feature_names: Vec<String>,
    layout_hash: u32,
    base_score: f64,
    trees: Vec<Tree>,
    metadata: ModelMetadata,
}

fn payload_checksum(payload: &serde_json::Value) -> RiskResult<String> {
    let bytes = serde_json::to_vec(payload).map_err(|e| RiskError::CorruptArtifact(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn corrupt(reason: impl Into<String>) -> RiskError {
    RiskError::CorruptArtifact(reason.into())
}

impl RiskModel {
    /// Serialize to the artifact envelope
    pub fn to_bytes(&self) -> RiskResult<Vec<u8>> {
        let payload = ModelPayload {
            schema_version: self.schema().version(),
            feature_names: self.schema().names().to_vec(),
            layout_hash: self.schema().layout_hash(),
            base_score: self.base_score(),
            trees: self.trees().to_vec(),
            metadata: self.metadata().clone(),
        };

        let payload = serde_json::to_value(&payload).map_err(|e| corrupt(e.to_string()))?;
        let envelope = ArtifactEnvelope {
            format: ARTIFACT_FORMAT.to_string(),
            format_version: ARTIFACT_FORMAT_VERSION,
            checksum: payload_checksum(&payload)?,
            payload,
        };

        serde_json::to_vec_pretty(&envelope).map_err(|e| corrupt(e.to_string()))
    }

    /// Save artifact (creates parent directories)
    pub fn save(&self, path: &Path) -> RiskResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_bytes()?)?;

        log::info!(
            "Model saved to {} ({} trees, fingerprint {})",
            path.display(),
            self.n_trees(),
            self.fingerprint()
        );
        Ok(())
    }

    /// Parse and verify an artifact.
    ///
    /// With `expected`, the artifact's feature set must match it
    /// (`SchemaMismatch` otherwise).
    pub fn from_bytes(bytes: &[u8], expected: Option<&FeatureSchema>) -> RiskResult<Self> {
        let envelope: ArtifactEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| corrupt(format!("unreadable artifact: {}", e)))?;

        if envelope.format != ARTIFACT_FORMAT {
            return Err(corrupt(format!("unknown format '{}'", envelope.format)));
        }
        if envelope.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {})",
                envelope.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let checksum = payload_checksum(&envelope.payload)?;
        if checksum != envelope.checksum {
            return Err(corrupt("checksum mismatch"));
        }

        let payload: ModelPayload = serde_json::from_value(envelope.payload)
            .map_err(|e| corrupt(format!("invalid payload: {}", e)))?;

        let computed = compute_layout_hash(payload.schema_version, &payload.feature_names);
        if computed != payload.layout_hash {
            return Err(corrupt(format!(
                "layout hash mismatch: stored {:08x}, computed {:08x}",
                payload.layout_hash, computed
            )));
        }

        let schema = FeatureSchema::new(payload.schema_version, payload.feature_names.as_slice())?;
        if let Some(expected) = expected {
            schema.reconcile(expected)?;
        }

        RiskModel::new(schema, payload.trees, payload.base_score, payload.metadata)
    }

    /// Load and verify an artifact from disk
    pub fn load(path: &Path, expected: Option<&FeatureSchema>) -> RiskResult<Self> {
        let bytes = fs::read(path)?;
        let model = Self::from_bytes(&bytes, expected)?;

        log::info!(
            "Model loaded from {}: {} ({} trees, fingerprint {})",
            path.display(),
            model.metadata().name,
            model.n_trees(),
            model.fingerprint()
        );
        Ok(model)
    }
}
