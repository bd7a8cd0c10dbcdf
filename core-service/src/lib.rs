//! Credit Risk Core
//!
//! Scores consumer credit risk with a gradient-boosted tree ensemble and
//! decomposes every score into additive per-feature attributions.
//!
//! ## Pipeline
//! raw record → `FeatureSchema::validate` → `RiskModel::predict` →
//! `Explainer::explain` → `PredictionContext` → narrative (external)
//!
//! ## Layout
//! - `logic::features` - Schema and validated feature vectors
//! - `logic::model` - Tree ensemble, threshold policy, artifact I/O
//! - `logic::explain` - TreeSHAP explainer, per-model cache, cohorts
//! - `logic::dataset` - Reference population statistics
//! - `logic::context` - PredictionContext assembly, scenarios
//! - `logic::session` - Conversation state and analysis sessions
//! - `logic::narrative` - Text-generation boundary
//! - `api` - Batch endpoint DTOs

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::config::{AnalysisConfig, EngineConfig, NarrativeConfig};
pub use logic::context::{Analyzer, PredictionContext, ScenarioOutcome};
pub use logic::error::{RiskError, RiskResult, ValidationError};
pub use logic::explain::{Explainer, Explanation, FeatureContribution};
pub use logic::features::{FeatureSchema, FeatureVector, RawRecord, RawValue};
pub use logic::model::{ModelEvaluation, RiskLabel, RiskModel, RiskPrediction};
pub use logic::narrative::{ChatCompletionClient, DisabledNarrator, NarrativeAdapter, NarrativeRequest};
pub use logic::session::{AnalysisSession, ConversationState, Narrative};

/// Install the `env_logger` backend (default filter `info`, override with `RUST_LOG`).
///
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
