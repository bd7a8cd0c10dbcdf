//! Population statistics, computed once when a reference set is built.

use serde::{Deserialize, Serialize};

use super::record::ReferenceRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub feature: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n − 1); 0 for a single row
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// None when the group is empty
    pub mean_high_risk: Option<f64>,
    pub mean_low_risk: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total: usize,
    pub high_risk_count: usize,
    pub low_risk_count: usize,
    pub high_risk_pct: f64,
    pub features: Vec<FeatureStats>,
}

impl DatasetStats {
    pub fn feature(&self, name: &str) -> Option<&FeatureStats> {
        self.features.iter().find(|f| f.feature == name)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median of an already sorted column
pub(crate) fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Compute statistics; `sorted_columns[i]` must be column `i` sorted ascending
pub(crate) fn compute(names: &[String], rows: &[ReferenceRow], sorted_columns: &[Vec<f64>]) -> DatasetStats {
    let total = rows.len();
    let high_risk_count = rows.iter().filter(|r| r.high_risk).count();
    let low_risk_count = total - high_risk_count;

    let features = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let column = &sorted_columns[i];
            let mean_all = mean(column).unwrap_or(0.0);
            let std = if column.len() > 1 {
                let ss: f64 = column.iter().map(|v| (v - mean_all).powi(2)).sum();
                (ss / (column.len() - 1) as f64).sqrt()
            } else {
                0.0
            };

            let high: Vec<f64> = rows
                .iter()
                .filter(|r| r.high_risk)
                .filter_map(|r| r.features.value_at(i))
                .collect();
            let low: Vec<f64> = rows
                .iter()
                .filter(|r| !r.high_risk)
                .filter_map(|r| r.features.value_at(i))
                .collect();

            FeatureStats {
                feature: name.clone(),
                mean: mean_all,
                median: median_sorted(column),
                std,
                min: column.first().copied().unwrap_or(0.0),
                max: column.last().copied().unwrap_or(0.0),
                mean_high_risk: mean(&high),
                mean_low_risk: mean(&low),
            }
        })
        .collect();

    DatasetStats {
        total,
        high_risk_count,
        low_risk_count,
        high_risk_pct: if total > 0 {
            high_risk_count as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        features,
    }
}
