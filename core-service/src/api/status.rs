use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::context::Analyzer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub version: String,
    pub schema_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,

    pub model: ModelStatus,
    pub explainer: ExplainerStatus,
    pub reference: ReferenceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub model_id: Option<String>,
    pub name: Option<String>,
    pub n_trees: usize,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerStatus {
    pub ready: bool,
    pub constructions: u64,
    pub built_at: Option<DateTime<Utc>>,
    pub strict_consistency: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceStatus {
    pub attached: bool,
    pub total: usize,
    pub high_risk_pct: Option<f64>,
}

/// Snapshot of what the analyzer currently holds
pub fn engine_status(analyzer: &Analyzer) -> EngineStatus {
    let model = analyzer.model().ok();
    let explainer = analyzer.explainer().current();
    let reference = analyzer.reference();

    let (schema_version, layout_hash, feature_count) = match &model {
        Some(m) => (m.schema().version(), m.schema().layout_hash(), m.schema().len()),
        None => (0, 0, 0),
    };

    EngineStatus {
        version: constants::APP_VERSION.to_string(),
        schema_version,
        layout_hash,
        feature_count,
        model: ModelStatus {
            loaded: model.is_some(),
            model_id: model.as_ref().map(|m| m.id().to_string()),
            name: model.as_ref().map(|m| m.metadata().name.clone()),
            n_trees: model.as_ref().map(|m| m.n_trees()).unwrap_or(0),
            fingerprint: model.as_ref().map(|m| m.fingerprint().to_string()),
        },
        explainer: ExplainerStatus {
            ready: explainer.is_some(),
            constructions: analyzer.explainer().constructions(),
            built_at: explainer.as_ref().map(|e| e.built_at()),
            strict_consistency: analyzer.config().strict_consistency,
        },
        reference: ReferenceStatus {
            attached: reference.is_some(),
            total: reference.as_ref().map(|r| r.len()).unwrap_or(0),
            high_risk_pct: reference.as_ref().map(|r| r.stats().high_risk_pct),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::AnalysisConfig;
    use crate::logic::features::CREDIT_FEATURE_COUNT;
    use crate::logic::fixtures;

    #[test]
    fn test_status_without_model() {
        let status = engine_status(&Analyzer::new(AnalysisConfig::default()));
        assert!(!status.model.loaded);
        assert!(!status.explainer.ready);
        assert_eq!(status.explainer.constructions, 0);
        assert!(!status.reference.attached);
    }

    #[test]
    fn test_status_with_model() {
        let model = fixtures::shared_model();
        let analyzer = Analyzer::with_model(model.clone(), AnalysisConfig::strict());
        let status = engine_status(&analyzer);

        assert!(status.model.loaded);
        assert_eq!(status.model.model_id, Some(model.id().to_string()));
        assert_eq!(status.model.n_trees, 4);
        assert_eq!(status.feature_count, CREDIT_FEATURE_COUNT);
        assert_eq!(status.layout_hash, model.schema().layout_hash());
        assert!(status.explainer.ready);
        assert_eq!(status.explainer.constructions, 1);
        assert!(status.explainer.strict_consistency);
    }
}
