use std::io::Write;

use serde::Serialize;

use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::{FeatureSchema, FeatureVector, RawRecord, RawValue};

/// One labelled reference profile
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceRow {
    pub features: FeatureVector,
    pub high_risk: bool,
}

fn invalid(line: usize, reason: impl Into<String>) -> RiskError {
    RiskError::InvalidReferenceData {
        line,
        reason: reason.into(),
    }
}

/// Outcome column accepts 0/1 or booleans
fn parse_outcome(value: &serde_json::Value, line: usize) -> RiskResult<bool> {
    match value {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Ok(true),
            Some(v) if v == 0.0 => Ok(false),
            _ => Err(invalid(line, format!("outcome must be 0 or 1, got {}", n))),
        },
        other => Err(invalid(line, format!("outcome must be 0 or 1, got {}", other))),
    }
}

/// Parse one JSONL line: feature columns plus the outcome column (1-based `line` for error reporting)
pub fn parse_line(
    schema: &FeatureSchema,
    text: &str,
    line: usize,
    outcome_column: &str,
) -> RiskResult<ReferenceRow> {
    let mut columns: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(text).map_err(|e| invalid(line, format!("not a JSON object: {}", e)))?;

    let outcome = columns
        .remove(outcome_column)
        .ok_or_else(|| invalid(line, format!("missing outcome column '{}'", outcome_column)))?;
    let high_risk = parse_outcome(&outcome, line)?;

    let record: RawRecord = columns
        .iter()
        .map(|(k, v)| (k.clone(), RawValue::from(v)))
        .collect();
    let features = schema
        .validate(&record)
        .map_err(|e| invalid(line, e.to_string()))?;

    Ok(ReferenceRow { features, high_risk })
}

/// Write one row as a JSONL line
pub fn write_line<W: Write>(writer: &mut W, row: &ReferenceRow, outcome_column: &str) -> RiskResult<()> {
    let mut columns = serde_json::Map::new();
    for (name, value) in row.features.iter() {
        columns.insert(name.to_string(), serde_json::json!(value));
    }
    columns.insert(outcome_column.to_string(), serde_json::json!(u8::from(row.high_risk)));

    let line = serde_json::to_string(&columns)
        .map_err(|e| RiskError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    writeln!(writer, "{}", line)?;
    Ok(())
}
