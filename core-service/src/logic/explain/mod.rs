//! Explain Module - Additive Attributions
//!
//! TreeSHAP attributions for individual predictions, a per-model explainer
//! cache, and cohort-level comparisons over a reference set.

pub mod cohort;
pub mod engine;
pub mod treeshap;
pub mod types;


pub use engine::Explainer;
pub use treeshap::TreeExplainer;
pub use types::{
    check_additivity, AttributionSummary, CohortAnalysis, CohortRow, ConsistencyCheck, Effect,
    Explanation, FeatureContribution,
};
