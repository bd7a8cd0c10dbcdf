//! API v1 Module
//!
//! Re-exports the current stable endpoints for versioning.

pub use super::batch::{score_batch, BatchItem, BatchOutcome, BatchRequest, BatchResponse};
pub use super::status::{engine_status, EngineStatus};
