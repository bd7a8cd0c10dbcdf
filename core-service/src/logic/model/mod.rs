//! Model Module - Tree Ensemble Inference Engine
//!
//! Scoring, label policy, global importance, held-out evaluation and
//! artifact persistence
//! for the gradient-boosted credit risk classifier.

pub mod artifact;
pub mod evaluation;
pub mod importance;
pub mod inference;
pub mod threshold;
pub mod tree;

#[cfg(test)]
mod tests;

// Re-export common types
pub use artifact::{ARTIFACT_FORMAT, ARTIFACT_FORMAT_VERSION};
pub use evaluation::ModelEvaluation;
pub use importance::{FeatureImportance, ImportanceKind};
pub use inference::{ModelId, ModelMetadata, ModelSlot, RiskModel};
pub use threshold::{logit, sigmoid, RiskBand, RiskLabel, RiskPrediction};
pub use tree::{Node, Tree, MAX_TREE_DEPTH};
