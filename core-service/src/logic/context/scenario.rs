//! Scenario projection ("what if these features changed?")

use std::collections::BTreeMap;

use serde::Serialize;

use crate::logic::error::RiskResult;
use crate::logic::model::RiskLabel;
use super::analyzer::Analyzer;
use super::types::PredictionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioDirection {
    /// Probability went down
    Improvement,
    Deterioration,
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub changes: BTreeMap<String, f64>,
    pub original_probability: f64,
    pub projected_probability: f64,
    pub original_label: RiskLabel,
    pub projected_label: RiskLabel,
    /// projected − original
    pub absolute_change: f64,
    /// Relative to the original probability; 0 when that is 0
    pub percent_change: f64,
    pub direction: ScenarioDirection,
    pub projected: PredictionContext,
}

impl ScenarioOutcome {
    pub fn label_changed(&self) -> bool {
        self.original_label != self.projected_label
    }
}

impl Analyzer {
    /// Overlay `changes` on the context's features and re-run analysis
    pub fn project(
        &self,
        context: &PredictionContext,
        changes: &BTreeMap<String, f64>,
    ) -> RiskResult<ScenarioOutcome> {
        let vector = context.features.with_overrides(changes)?;
        let projected = self.analyze_vector(&vector, None)?;

        let original_probability = context.prediction.probability();
        let projected_probability = projected.prediction.probability();
        let absolute_change = projected_probability - original_probability;
        let percent_change = if original_probability > 0.0 {
            absolute_change / original_probability * 100.0
        } else {
            0.0
        };

        let direction = if absolute_change < 0.0 {
            ScenarioDirection::Improvement
        } else if absolute_change > 0.0 {
            ScenarioDirection::Deterioration
        } else {
            ScenarioDirection::Unchanged
        };

        log::debug!(
            "Scenario over {} change(s): {:.4} -> {:.4}",
            changes.len(),
            original_probability,
            projected_probability
        );

        Ok(ScenarioOutcome {
            changes: changes.clone(),
            original_probability,
            projected_probability,
            original_label: context.prediction.label(),
            projected_label: projected.prediction.label(),
            absolute_change,
            percent_change,
            direction,
            projected,
        })
    }
}
