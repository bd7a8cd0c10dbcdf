//! API Module
//!
//! Serializable request/response types for callers embedding the engine.
//!
//! Structure:
//! - batch.rs: Batch scoring endpoint
//! - status.rs: Engine status snapshot
//! - v1/mod.rs: Re-exports the current endpoints as the v1 API
//!
//! Add `v2/` for breaking DTO changes and keep `v1` for old clients.

pub mod batch;
pub mod status;
pub mod v1;

pub use batch::{score_batch, BatchItem, BatchOutcome, BatchRequest, BatchResponse};
pub use status::{engine_status, EngineStatus, ExplainerStatus, ModelStatus, ReferenceStatus};
