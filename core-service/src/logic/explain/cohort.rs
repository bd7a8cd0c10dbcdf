//! Cohort analysis over a reference set
//!
//! Which features separate high-risk from low-risk populations, by mean
//! absolute attribution per group.

use crate::logic::error::RiskResult;
use crate::logic::features::FeatureVector;
use crate::logic::model::RiskModel;
use super::engine::Explainer;
use super::types::{AttributionSummary, CohortAnalysis, CohortRow};

impl Explainer {
    /// Partition `vectors` at `threshold` (probability ≥ threshold is high
    /// risk) and compare mean |attribution| per feature.
    ///
    /// Rows are sorted by `high − low` descending, ties in schema order.
    /// An empty group contributes zero means.
    pub fn cohort_analysis(
        &self,
        model: &RiskModel,
        vectors: &[FeatureVector],
        threshold: f64,
    ) -> RiskResult<CohortAnalysis> {
        let n = model.schema().len();
        let mut high_sum = vec![0.0; n];
        let mut low_sum = vec![0.0; n];
        let mut high_count = 0usize;
        let mut low_count = 0usize;

        for vector in vectors {
            let probability = model.predict(vector)?.probability();
            let phi = self.attributions(model, vector)?;

            let (sums, count) = if probability >= threshold {
                (&mut high_sum, &mut high_count)
            } else {
                (&mut low_sum, &mut low_count)
            };
            for (sum, value) in sums.iter_mut().zip(&phi) {
                *sum += value.abs();
            }
            *count += 1;
        }

        let mean = |sum: f64, count: usize| if count > 0 { sum / count as f64 } else { 0.0 };

        let mut rows: Vec<CohortRow> = model
            .schema()
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let high = mean(high_sum[i], high_count);
                let low = mean(low_sum[i], low_count);
                CohortRow {
                    feature: name.clone(),
                    high_risk_mean_abs: high,
                    low_risk_mean_abs: low,
                    difference: high - low,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.difference.total_cmp(&a.difference));

        log::debug!(
            "Cohort analysis at {:.2}: {} high risk, {} low risk",
            threshold,
            high_count,
            low_count
        );

        Ok(CohortAnalysis {
            threshold,
            high_risk_count: high_count,
            low_risk_count: low_count,
            rows,
        })
    }

    /// Global ranking by mean |attribution| over `vectors`
    pub fn mean_abs_attribution(
        &self,
        model: &RiskModel,
        vectors: &[FeatureVector],
    ) -> RiskResult<Vec<AttributionSummary>> {
        let n = model.schema().len();
        let mut sums = vec![0.0; n];

        for vector in vectors {
            let phi = self.attributions(model, vector)?;
            for (sum, value) in sums.iter_mut().zip(&phi) {
                *sum += value.abs();
            }
        }

        let count = vectors.len().max(1) as f64;
        let mut ranked: Vec<(usize, f64)> = sums.into_iter().map(|s| s / count).enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(position, (index, mean))| AttributionSummary {
                feature: model.schema().name_at(index).unwrap_or_default().to_string(),
                mean_abs_attribution: mean,
                rank: position + 1,
            })
            .collect())
    }
}
