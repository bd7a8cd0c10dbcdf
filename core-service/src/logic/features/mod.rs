//! Features Module - Feature Schema & Record Validation
//!
//! Raw caller records are validated here and aligned to the canonical
//! order the model was fit on. Nothing downstream sees unvalidated input.

pub mod layout;
pub mod vector;


// Re-export common types
pub use layout::{
    compute_layout_hash, FeatureSchema, LayoutInfo, CREDIT_FEATURE_COUNT, CREDIT_FEATURE_LAYOUT,
    SCHEMA_VERSION,
};
pub use vector::{record_from_pairs, FeatureVector, RawRecord, RawValue};
