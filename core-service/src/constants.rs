//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Runtime overrides come from environment variables, see `EngineConfig::from_env`.

use std::path::PathBuf;

/// Probability above which a prediction is labelled HIGH RISK.
///
/// Policy constant, not learned from data.
pub const RISK_THRESHOLD: f64 = 0.5;

/// Relative tolerance for `base_value + sum(attributions) == margin`
pub const ADDITIVITY_TOLERANCE: f64 = 1e-4;

/// Number of ranked contributions carried by a prediction context
pub const DEFAULT_TOP_K: usize = 5;

/// Conversation turns forwarded to the narrative service
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Default chat-completions endpoint
pub const DEFAULT_NARRATIVE_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default narrative model
pub const DEFAULT_NARRATIVE_MODEL: &str = "gpt-4o";

/// Default sampling temperature for narratives
pub const DEFAULT_NARRATIVE_TEMPERATURE: f32 = 0.3;

/// Default narrative timeout (seconds)
pub const DEFAULT_NARRATIVE_TIMEOUT: u64 = 30;

/// Default retry count for the narrative service
pub const DEFAULT_NARRATIVE_RETRIES: u32 = 2;

/// Outcome column of the reference dataset
pub const DEFAULT_OUTCOME_COLUMN: &str = "is_high_risk";

/// App name
pub const APP_NAME: &str = "credit-risk";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Base directory for model artifacts and reference data
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Model artifact path from environment or default location
pub fn get_model_path() -> PathBuf {
    std::env::var("CREDIT_RISK_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join("model.json"))
}

/// Reference dataset path from environment or default location
pub fn get_reference_path() -> PathBuf {
    std::env::var("CREDIT_RISK_REFERENCE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join("reference.jsonl"))
}

/// Strict consistency mode (fail on additivity violations)
pub fn is_strict_mode() -> bool {
    std::env::var("CREDIT_RISK_STRICT")
        .map(|s| s.to_lowercase() == "true" || s == "1")
        .unwrap_or(false)
}

/// Additivity tolerance from environment or default
pub fn get_additivity_tolerance() -> f64 {
    std::env::var("CREDIT_RISK_TOLERANCE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(ADDITIVITY_TOLERANCE)
}

/// Narrative endpoint from environment or default
pub fn get_narrative_endpoint() -> String {
    std::env::var("NARRATIVE_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_NARRATIVE_ENDPOINT.to_string())
}

/// Narrative API key (falls back to OPENAI_API_KEY)
pub fn get_narrative_api_key() -> Option<String> {
    std::env::var("NARRATIVE_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Narrative model from environment or default
pub fn get_narrative_model() -> String {
    std::env::var("NARRATIVE_MODEL")
        .unwrap_or_else(|_| DEFAULT_NARRATIVE_MODEL.to_string())
}

/// Narrative timeout from environment or default
pub fn get_narrative_timeout() -> u64 {
    std::env::var("NARRATIVE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_NARRATIVE_TIMEOUT)
}

/// Narrative retry count from environment or default
pub fn get_narrative_retries() -> u32 {
    std::env::var("NARRATIVE_MAX_RETRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_NARRATIVE_RETRIES)
}
