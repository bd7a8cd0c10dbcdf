//! Error types shared by every engine.

use thiserror::Error;

pub type RiskResult<T> = Result<T, RiskError>;

/// Record validation failures (boundary checks only)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Schema features absent from the record (schema order)
    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// Record keys the schema does not know (sorted)
    #[error("Unknown features: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),

    #[error("Feature '{feature}' must be numeric, got {found}")]
    InvalidType { feature: String, found: String },

    #[error("Feature '{feature}' has invalid value: {value}")]
    InvalidValue { feature: String, value: f64 },
}

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Explainer not ready: no model attached")]
    ExplainerNotReady,

    #[error(
        "Inconsistent explanation: base {base_value:.6} + attributions = {reconstructed:.6}, model margin {margin:.6}"
    )]
    InconsistentExplanation {
        base_value: f64,
        reconstructed: f64,
        margin: f64,
    },

    #[error("Corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("Schema mismatch (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Narrative unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("No active analysis in this session")]
    NoActiveAnalysis,

    #[error("Invalid reference data (line {line}): {reason}")]
    InvalidReferenceData { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RiskError {
    /// Stable machine-readable code
    pub fn kind(&self) -> &'static str {
        match self {
            RiskError::Validation(ValidationError::MissingFeatures(_)) => "missing_features",
            RiskError::Validation(ValidationError::UnknownFeatures(_)) => "unknown_features",
            RiskError::Validation(ValidationError::InvalidType { .. }) => "invalid_type",
            RiskError::Validation(ValidationError::InvalidValue { .. }) => "invalid_value",
            RiskError::ModelNotLoaded => "model_not_loaded",
            RiskError::ExplainerNotReady => "explainer_not_ready",
            RiskError::InconsistentExplanation { .. } => "inconsistent_explanation",
            RiskError::CorruptArtifact(_) => "corrupt_artifact",
            RiskError::SchemaMismatch { .. } => "schema_mismatch",
            RiskError::NarrativeUnavailable(_) => "narrative_unavailable",
            RiskError::NoActiveAnalysis => "no_active_analysis",
            RiskError::InvalidReferenceData { .. } => "invalid_reference_data",
            RiskError::Io(_) => "io",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RiskError::Validation(_))
    }
}
