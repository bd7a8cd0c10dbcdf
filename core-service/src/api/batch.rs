//! Batch scoring endpoint
//!
//! One bad record never fails the batch: each item carries either a
//! prediction or the error that record produced, in input order.

use serde::{Deserialize, Serialize};

use crate::logic::context::Analyzer;
use crate::logic::error::RiskResult;
use crate::logic::features::RawRecord;
use crate::logic::model::RiskPrediction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Prediction(RiskPrediction),
    Error { kind: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    /// Position of the record in the request
    pub index: usize,
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Prediction(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Score every record of `request`.
///
/// Fails as a whole only when no model is loaded.
pub fn score_batch(analyzer: &Analyzer, request: &BatchRequest) -> RiskResult<BatchResponse> {
    let results: Vec<BatchItem> = analyzer
        .analyze_batch(&request.records)?
        .into_iter()
        .enumerate()
        .map(|(index, result)| BatchItem {
            index,
            outcome: match result {
                Ok(prediction) => BatchOutcome::Prediction(prediction),
                Err(e) => BatchOutcome::Error {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                },
            },
        })
        .collect();

    let succeeded = results.iter().filter(|item| item.is_ok()).count();
    Ok(BatchResponse {
        failed: results.len() - succeeded,
        succeeded,
        results,
    })
}
