//! Context Module - PredictionContext assembly
//!
//! Merges prediction, explanation and optional population comparison into
//! one immutable context, and projects what-if scenarios from it.

pub mod analyzer;
pub mod scenario;
pub mod types;


pub use analyzer::Analyzer;
pub use scenario::{ScenarioDirection, ScenarioOutcome};
pub use types::PredictionContext;
