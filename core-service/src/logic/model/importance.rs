//! Global feature importance from split statistics
//!
//! This is the model's own view of which features matter. It is kept
//! separate from attribution-based rankings in `explain`.

use serde::{Deserialize, Serialize};

use super::inference::RiskModel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceKind {
    /// Average gain per split
    #[default]
    Gain,
    TotalGain,
    /// Number of splits
    Weight,
    /// Average cover per split
    Cover,
}

/// Normalized importance of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Share of total importance (sums to 1 across features)
    pub importance: f64,
    /// 1-based position in the descending ranking
    pub rank: usize,
}

impl RiskModel {
    /// All schema features ranked by `kind`, descending, ties in schema order
    pub fn feature_importance(&self, kind: ImportanceKind) -> Vec<FeatureImportance> {
        let n = self.schema().len();
        let mut total_gain = vec![0.0f64; n];
        let mut total_cover = vec![0.0f64; n];
        let mut count = vec![0usize; n];

        for split in self.trees().iter().flat_map(|t| t.splits()) {
            total_gain[split.feature] += split.gain;
            total_cover[split.feature] += split.cover;
            count[split.feature] += 1;
        }

        let raw: Vec<f64> = (0..n)
            .map(|i| {
                if count[i] == 0 {
                    return 0.0;
                }
                match kind {
                    ImportanceKind::Gain => total_gain[i] / count[i] as f64,
                    ImportanceKind::TotalGain => total_gain[i],
                    ImportanceKind::Weight => count[i] as f64,
                    ImportanceKind::Cover => total_cover[i] / count[i] as f64,
                }
            })
            .collect();

        let sum: f64 = raw.iter().sum();

        let mut ranked: Vec<(usize, f64)> = raw
            .into_iter()
            .map(|v| if sum > 0.0 { v / sum } else { 0.0 })
            .enumerate()
            .collect();
        // Stable sort keeps schema order among ties
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .enumerate()
            .map(|(position, (index, importance))| FeatureImportance {
                feature: self.schema().name_at(index).unwrap_or_default().to_string(),
                importance,
                rank: position + 1,
            })
            .collect()
    }

    /// Importance and rank for the requested features (unknown names skipped)
    pub fn feature_statistics<S: AsRef<str>>(&self, names: &[S]) -> Vec<FeatureImportance> {
        let ranking = self.feature_importance(ImportanceKind::default());
        names
            .iter()
            .filter_map(|name| ranking.iter().find(|r| r.feature == name.as_ref()).cloned())
            .collect()
    }
}
