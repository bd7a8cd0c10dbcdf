use serde::{Deserialize, Serialize};

use crate::logic::model::ModelId;

/// Which way a feature pushed the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    IncreasesRisk,
    DecreasesRisk,
    Neutral,
}

impl Effect {
    pub fn of(attribution: f64) -> Self {
        if attribution > 0.0 {
            Effect::IncreasesRisk
        } else if attribution < 0.0 {
            Effect::DecreasesRisk
        } else {
            Effect::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    /// Feature value of the explained instance
    pub value: f64,
    /// Signed contribution in margin space
    pub attribution: f64,
    pub importance: f64, // |attribution|
    pub effect: Effect,
}

impl FeatureContribution {
    pub fn new(feature: &str, value: f64, attribution: f64) -> Self {
        Self {
            feature: feature.to_string(),
            value,
            attribution,
            importance: attribution.abs(),
            effect: Effect::of(attribution),
        }
    }
}

/// Additive decomposition of one prediction.
///
/// `contributions` covers every schema feature, ranked by |attribution|
/// descending with ties in schema order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub model_id: ModelId,
    /// Expected margin with no feature information
    pub base_value: f64,
    /// Model margin for the instance
    pub margin: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl Explanation {
    /// `base_value + Σ attributions`
    pub fn reconstructed(&self) -> f64 {
        self.base_value + self.contributions.iter().map(|c| c.attribution).sum::<f64>()
    }

    pub fn additivity_error(&self) -> f64 {
        (self.reconstructed() - self.margin).abs()
    }

    pub fn top(&self, k: usize) -> &[FeatureContribution] {
        &self.contributions[..k.min(self.contributions.len())]
    }

    pub fn contribution(&self, feature: &str) -> Option<&FeatureContribution> {
        self.contributions.iter().find(|c| c.feature == feature)
    }

    /// Positive contributions, in ranked order
    pub fn risk_drivers(&self) -> Vec<&FeatureContribution> {
        self.contributions.iter().filter(|c| c.attribution > 0.0).collect()
    }
}

/// Result of the additive reconstruction check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub base_value: f64,
    pub reconstructed: f64,
    pub margin: f64,
    pub error: f64,
    pub tolerance: f64,
    pub consistent: bool,
}

/// Relative check: `|base + Σφ − margin| ≤ tol · max(1, |margin|)`
pub fn check_additivity(explanation: &Explanation, tolerance: f64) -> ConsistencyCheck {
    let reconstructed = explanation.reconstructed();
    let error = (reconstructed - explanation.margin).abs();
    let allowed = tolerance * explanation.margin.abs().max(1.0);

    ConsistencyCheck {
        base_value: explanation.base_value,
        reconstructed,
        margin: explanation.margin,
        error,
        tolerance,
        consistent: error <= allowed,
    }
}

/// Per-feature cohort comparison row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    pub feature: String,
    pub high_risk_mean_abs: f64,
    pub low_risk_mean_abs: f64,
    /// high − low
    pub difference: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortAnalysis {
    pub threshold: f64,
    pub high_risk_count: usize,
    pub low_risk_count: usize,
    pub rows: Vec<CohortRow>,
}

/// Global ranking by mean |attribution|
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSummary {
    pub feature: String,
    pub mean_abs_attribution: f64,
    pub rank: usize,
}
