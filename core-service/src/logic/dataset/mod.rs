//! Dataset Module - Reference Population
//!
//! Labelled credit profiles used to place one applicant within a
//! population. Stored as JSONL (one object per line: the feature columns
//! plus an outcome column). Statistics are computed once at construction.

pub mod record;
pub mod stats;

#[cfg(test)]
mod tests;

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_OUTCOME_COLUMN;
use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::{FeatureSchema, FeatureVector};
pub use record::ReferenceRow;
pub use stats::{DatasetStats, FeatureStats};

/// Where one applicant value sits in the population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationComparison {
    pub feature: String,
    pub user_value: f64,
    pub population_mean: f64,
    pub population_median: f64,
    /// Share of the population strictly below the user, in percent
    pub percentile: f64,
    pub above_average: bool,
}

/// Reference row close to an applicant
#[derive(Debug, Clone, Serialize)]
pub struct SimilarProfile {
    pub row: usize,
    pub distance: f64,
    pub high_risk: bool,
    pub features: FeatureVector,
}

#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    schema: FeatureSchema,
    rows: Vec<ReferenceRow>,
    sorted_columns: Vec<Vec<f64>>,
    stats: DatasetStats,
}

impl ReferenceDataset {
    /// Build from in-memory rows; every vector must belong to `schema`
    pub fn from_rows(schema: FeatureSchema, rows: Vec<ReferenceRow>) -> RiskResult<Self> {
        if rows.is_empty() {
            return Err(RiskError::InvalidReferenceData {
                line: 0,
                reason: "reference dataset is empty".to_string(),
            });
        }
        if let Some(i) = rows.iter().position(|r| !r.features.is_compatible(&schema)) {
            return Err(RiskError::InvalidReferenceData {
                line: i + 1,
                reason: "row was built for a different feature schema".to_string(),
            });
        }

        let sorted_columns: Vec<Vec<f64>> = (0..schema.len())
            .map(|i| {
                let mut column: Vec<f64> = rows.iter().filter_map(|r| r.features.value_at(i)).collect();
                column.sort_by(f64::total_cmp);
                column
            })
            .collect();

        let stats = stats::compute(schema.names(), &rows, &sorted_columns);

        log::info!(
            "Reference dataset ready: {} rows ({} high risk, {:.1}%)",
            stats.total,
            stats.high_risk_count,
            stats.high_risk_pct
        );

        Ok(Self {
            schema,
            rows,
            sorted_columns,
            stats,
        })
    }

    /// Read JSONL with the default outcome column
    pub fn load_jsonl(path: &Path, schema: FeatureSchema) -> RiskResult<Self> {
        let file = File::open(path)?;
        log::debug!("Loading reference dataset from {}", path.display());
        Self::from_reader(BufReader::new(file), schema, DEFAULT_OUTCOME_COLUMN)
    }

    /// Read JSONL from any reader; blank lines are skipped
    pub fn from_reader<R: BufRead>(reader: R, schema: FeatureSchema, outcome_column: &str) -> RiskResult<Self> {
        let mut rows = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(record::parse_line(&schema, &line, i + 1, outcome_column)?);
        }
        Self::from_rows(schema, rows)
    }

    /// Write JSONL (creates parent directories)
    pub fn save_jsonl(&self, path: &Path) -> RiskResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        for row in &self.rows {
            record::write_line(&mut writer, row, DEFAULT_OUTCOME_COLUMN)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn vectors(&self) -> Vec<FeatureVector> {
        self.rows.iter().map(|r| r.features.clone()).collect()
    }

    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    /// Applicant value in this dataset's feature order
    fn value_for(&self, vector: &FeatureVector, index: usize, name: &str) -> RiskResult<f64> {
        let value = if vector.is_compatible(&self.schema) {
            vector.value_at(index)
        } else {
            vector.get(name)
        };
        value.ok_or_else(|| RiskError::SchemaMismatch {
            missing: vec![name.to_string()],
            unexpected: Vec::new(),
        })
    }

    /// Compare every feature of `vector` against the population (schema order)
    pub fn compare(&self, vector: &FeatureVector) -> RiskResult<Vec<PopulationComparison>> {
        let n = self.rows.len() as f64;

        self.schema
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| -> RiskResult<PopulationComparison> {
                let user_value = self.value_for(vector, i, name)?;
                let column = &self.sorted_columns[i];
                let below = column.partition_point(|v| *v < user_value);
                let stats = &self.stats.features[i];

                Ok(PopulationComparison {
                    feature: name.clone(),
                    user_value,
                    population_mean: stats.mean,
                    population_median: stats.median,
                    percentile: below as f64 / n * 100.0,
                    above_average: user_value > stats.mean,
                })
            })
            .collect()
    }

    /// `n` nearest rows by standardized Euclidean distance.
    ///
    /// Features with zero spread are ignored; ties keep row order.
    pub fn similar_profiles(&self, vector: &FeatureVector, n: usize) -> RiskResult<Vec<SimilarProfile>> {
        let user: Vec<f64> = self
            .schema
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| self.value_for(vector, i, name))
            .collect::<RiskResult<_>>()?;

        let mut scored: Vec<(usize, f64)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                let distance = self
                    .stats
                    .features
                    .iter()
                    .zip(r.features.values())
                    .zip(&user)
                    .filter(|((s, _), _)| s.std > 0.0)
                    .map(|((s, v), u)| ((v - u) / s.std).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (row, distance)
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(n)
            .map(|(row, distance)| SimilarProfile {
                row,
                distance,
                high_risk: self.rows[row].high_risk,
                features: self.rows[row].features.clone(),
            })
            .collect())
    }
}
