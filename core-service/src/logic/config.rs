//! Engine configuration
//!
//! Defaults live in `crate::constants`; `EngineConfig::from_env` layers
//! environment overrides (and an optional `.env` file) on top.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

/// Scoring / explanation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Fail with `InconsistentExplanation` instead of flagging the context
    pub strict_consistency: bool,

    /// Relative tolerance of the additive reconstruction check
    pub additivity_tolerance: f64,

    /// Ranked contributions kept on a context
    pub top_k: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strict_consistency: false,
            additivity_tolerance: constants::ADDITIVITY_TOLERANCE,
            top_k: constants::DEFAULT_TOP_K,
        }
    }
}

impl AnalysisConfig {
    pub fn strict() -> Self {
        Self {
            strict_consistency: true,
            ..Default::default()
        }
    }
}

/// Narrative service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub history_window: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_NARRATIVE_ENDPOINT.to_string(),
            api_key: None,
            model: constants::DEFAULT_NARRATIVE_MODEL.to_string(),
            temperature: constants::DEFAULT_NARRATIVE_TEMPERATURE,
            max_tokens: 1000,
            timeout_secs: constants::DEFAULT_NARRATIVE_TIMEOUT,
            max_retries: constants::DEFAULT_NARRATIVE_RETRIES,
            history_window: constants::DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl NarrativeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub narrative: NarrativeConfig,
}

impl EngineConfig {
    /// Load `.env` (if present) then read overrides from the environment
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let analysis = AnalysisConfig {
            strict_consistency: constants::is_strict_mode(),
            additivity_tolerance: constants::get_additivity_tolerance(),
            top_k: constants::DEFAULT_TOP_K,
        };

        let narrative = NarrativeConfig {
            endpoint: constants::get_narrative_endpoint(),
            api_key: constants::get_narrative_api_key(),
            model: constants::get_narrative_model(),
            timeout_secs: constants::get_narrative_timeout(),
            max_retries: constants::get_narrative_retries(),
            ..Default::default()
        };

        if narrative.api_key.is_none() {
            log::info!("No narrative API key configured - narratives disabled");
        }

        Self { analysis, narrative }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_defaults() {
        let config = AnalysisConfig::default();
        assert!(!config.strict_consistency);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.additivity_tolerance, 1e-4);
        assert!(AnalysisConfig::strict().strict_consistency);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = NarrativeConfig {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(config.is_configured());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
