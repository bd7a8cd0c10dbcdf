use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::logic::dataset::PopulationComparison;
use crate::logic::explain::{ConsistencyCheck, Explanation, FeatureContribution};
use crate::logic::features::FeatureVector;
use crate::logic::model::{FeatureImportance, ModelId, RiskBand, RiskPrediction};

/// Everything known about one scored applicant.
///
/// Built in one step by `Analyzer`; never mutated afterwards (sessions hold
/// it behind `Arc` and replace it wholesale).
#[derive(Debug, Clone, Serialize)]
pub struct PredictionContext {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub model_id: ModelId,
    pub features: FeatureVector,
    pub prediction: RiskPrediction,
    pub band: RiskBand,
    pub explanation: Explanation,
    /// Top contributions by |attribution|, any sign
    pub top_contributions: Vec<FeatureContribution>,
    /// Present only when a reference population was available
    pub population: Option<Vec<PopulationComparison>>,
    /// Global importance and rank of every feature
    pub feature_statistics: Vec<FeatureImportance>,
    pub consistency: ConsistencyCheck,
}

impl PredictionContext {
    /// True when the additivity check failed in lenient mode
    pub fn is_flagged(&self) -> bool {
        !self.consistency.consistent
    }

    pub fn probability(&self) -> f64 {
        self.prediction.probability()
    }

    /// Positive-attribution entries of the top contributions
    pub fn risk_factors(&self) -> Vec<&FeatureContribution> {
        self.top_contributions
            .iter()
            .filter(|c| c.attribution > 0.0)
            .collect()
    }

    pub fn comparison(&self, feature: &str) -> Option<&PopulationComparison> {
        self.population.as_ref()?.iter().find(|c| c.feature == feature)
    }

    pub fn importance(&self, feature: &str) -> Option<&FeatureImportance> {
        self.feature_statistics.iter().find(|s| s.feature == feature)
    }
}
