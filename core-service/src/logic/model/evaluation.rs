//! Model Evaluation - held-out metrics over a labelled dataset
//!
//! Ranking metrics use the raw probability; the confusion matrix and
//! accuracy use the HIGH RISK policy (p > 0.5).

use serde::Serialize;

use crate::logic::dataset::ReferenceDataset;
use crate::logic::error::{RiskError, RiskResult};
use super::inference::RiskModel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEvaluation {
    pub samples: usize,
    pub roc_auc: f64,
    pub average_precision: f64,
    /// `[[tn, fp], [fn, tp]]`, rows are the true outcome
    pub confusion: [[usize; 2]; 2],
    pub accuracy: f64,
}

impl RiskModel {
    /// Score every row of `dataset` against its recorded outcome.
    ///
    /// Both outcome classes must be present.
    pub fn evaluate(&self, dataset: &ReferenceDataset) -> RiskResult<ModelEvaluation> {
        let stats = dataset.stats();
        if stats.high_risk_count == 0 || stats.low_risk_count == 0 {
            return Err(RiskError::InvalidReferenceData {
                line: 0,
                reason: "evaluation needs both high and low risk outcomes".to_string(),
            });
        }

        let mut scored = Vec::with_capacity(dataset.len());
        let mut confusion = [[0usize; 2]; 2];
        for row in dataset.rows() {
            let prediction = self.predict(&row.features)?;
            confusion[row.high_risk as usize][prediction.is_high_risk() as usize] += 1;
            scored.push((prediction.probability(), row.high_risk));
        }

        let correct = confusion[0][0] + confusion[1][1];
        let evaluation = ModelEvaluation {
            samples: scored.len(),
            roc_auc: roc_auc(&mut scored),
            average_precision: average_precision(&mut scored),
            confusion,
            accuracy: correct as f64 / dataset.len() as f64,
        };

        log::info!(
            "Model {} evaluated on {} rows: ROC-AUC {:.4}, AP {:.4}, accuracy {:.4}",
            self.id(),
            evaluation.samples,
            evaluation.roc_auc,
            evaluation.average_precision,
            evaluation.accuracy
        );
        Ok(evaluation)
    }
}

/// Mann-Whitney estimate; tied scores share their average rank
fn roc_auc(scored: &mut [(f64, bool)]) -> f64 {
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let positives = scored.iter().filter(|(_, high)| *high).count() as f64;
    let negatives = scored.len() as f64 - positives;

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < scored.len() {
        let mut end = start;
        while end < scored.len() && scored[end].0 == scored[start].0 {
            end += 1;
        }
        // 1-based ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = scored[start..end].iter().filter(|(_, high)| *high).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end;
    }

    (positive_rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
}

/// Precision summed over recall steps, one step per distinct threshold
fn average_precision(scored: &mut [(f64, bool)]) -> f64 {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let positives = scored.iter().filter(|(_, high)| *high).count() as f64;
    let mut true_positives = 0usize;
    let mut previous_recall = 0.0;
    let mut ap = 0.0;

    let mut start = 0;
    while start < scored.len() {
        let mut end = start;
        while end < scored.len() && scored[end].0 == scored[start].0 {
            if scored[end].1 {
                true_positives += 1;
            }
            end += 1;
        }
        let recall = true_positives as f64 / positives;
        let precision = true_positives as f64 / end as f64;
        ap += (recall - previous_recall) * precision;
        previous_recall = recall;
        start = end;
    }

    ap
}
