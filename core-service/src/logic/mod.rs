//! Logic Module - Scoring & Explanation Engines
//!
//! ## Architecture
//! - `features/` - Feature schema, record validation, aligned vectors
//! - `model/` - Tree ensemble inference, label policy, artifacts
//! - `explain/` - Additive attributions (TreeSHAP) and cohort analysis
//! - `dataset/` - Reference population for comparisons
//! - `context/` - PredictionContext assembly and scenario projection
//! - `session/` - Per-caller conversation + bound context
//! - `narrative/` - External text-generation boundary

// Shared
pub mod config;
pub mod error;

// Engines
pub mod features;
pub mod model;
pub mod explain;
pub mod dataset;
pub mod context;
pub mod session;
pub mod narrative;

#[cfg(test)]
pub(crate) mod fixtures;
