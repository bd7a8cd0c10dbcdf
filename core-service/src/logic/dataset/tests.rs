use std::io::Cursor;

use tempfile::tempdir;

use super::{ReferenceDataset, ReferenceRow};
use crate::logic::error::RiskError;
use crate::logic::features::{record_from_pairs, FeatureSchema, FeatureVector};
use crate::logic::fixtures;

fn small_schema() -> FeatureSchema {
    FeatureSchema::new(1, &["income", "utilization"]).unwrap()
}

fn vector(schema: &FeatureSchema, income: f64, utilization: f64) -> FeatureVector {
    schema
        .validate(&record_from_pairs(&[("income", income), ("utilization", utilization)]))
        .unwrap()
}

/// income 10..=50, utilization constant 30; rows 4 and 5 are high risk
fn small_dataset() -> ReferenceDataset {
    let schema = small_schema();
    let rows = [10.0, 20.0, 30.0, 40.0, 50.0]
        .iter()
        .enumerate()
        .map(|(i, income)| ReferenceRow {
            features: vector(&schema, *income, 30.0),
            high_risk: i >= 3,
        })
        .collect();
    ReferenceDataset::from_rows(schema, rows).unwrap()
}

#[test]
fn test_statistics_computed_once_at_load() {
    let dataset = small_dataset();
    let stats = dataset.stats();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.high_risk_count, 2);
    assert_eq!(stats.low_risk_count, 3);
    assert!((stats.high_risk_pct - 40.0).abs() < 1e-12);

    let income = stats.feature("income").unwrap();
    assert_eq!(income.mean, 30.0);
    assert_eq!(income.median, 30.0);
    assert!((income.std - 250.0f64.sqrt()).abs() < 1e-12);
    assert_eq!(income.min, 10.0);
    assert_eq!(income.max, 50.0);
    assert_eq!(income.mean_high_risk, Some(45.0));
    assert_eq!(income.mean_low_risk, Some(20.0));

    assert_eq!(stats.feature("utilization").unwrap().std, 0.0);
}

#[test]
fn test_percentile_strictly_less() {
    let dataset = small_dataset();
    let schema = small_schema();

    let at = |income: f64| {
        dataset.compare(&vector(&schema, income, 30.0)).unwrap()[0].percentile
    };

    // Minimum: nobody strictly below
    assert_eq!(at(10.0), 0.0);
    // Equal to the maximum: 4 of 5 strictly below
    assert_eq!(at(50.0), 80.0);
    // Above the maximum
    assert_eq!(at(1000.0), 100.0);
    assert_eq!(at(35.0), 60.0);
}

#[test]
fn test_compare_fields_in_schema_order() {
    let dataset = small_dataset();
    let comparisons = dataset.compare(&vector(&small_schema(), 30.0, 31.0)).unwrap();

    assert_eq!(comparisons.len(), 2);
    assert_eq!(comparisons[0].feature, "income");
    assert_eq!(comparisons[0].population_mean, 30.0);
    // Equal to the mean is not above average
    assert!(!comparisons[0].above_average);

    assert_eq!(comparisons[1].feature, "utilization");
    assert!(comparisons[1].above_average);
    assert_eq!(comparisons[1].percentile, 100.0);
}

#[test]
fn test_similar_profiles() {
    let dataset = small_dataset();
    let similar = dataset.similar_profiles(&vector(&small_schema(), 38.0, 99.0), 2).unwrap();

    assert_eq!(similar.len(), 2);
    // utilization has zero spread and is ignored
    assert_eq!(similar[0].row, 3);
    assert_eq!(similar[1].row, 2);
    assert!(similar[0].distance <= similar[1].distance);
    assert!(similar[0].high_risk);
}

#[test]
fn test_jsonl_load_with_blank_lines_and_bool_outcome() {
    let data = "\
{\"income\": 10, \"utilization\": 30, \"is_high_risk\": 0}

{\"income\": 20.5, \"utilization\": 35, \"is_high_risk\": true}
";
    let dataset =
        ReferenceDataset::from_reader(Cursor::new(data), small_schema(), "is_high_risk").unwrap();

    assert_eq!(dataset.len(), 2);
    assert!(!dataset.rows()[0].high_risk);
    assert!(dataset.rows()[1].high_risk);
    assert_eq!(dataset.rows()[1].features.get("income"), Some(20.5));
}

#[test]
fn test_jsonl_bad_rows_report_line() {
    let missing_outcome = "{\"income\": 10, \"utilization\": 30}\n";
    match ReferenceDataset::from_reader(Cursor::new(missing_outcome), small_schema(), "is_high_risk") {
        Err(RiskError::InvalidReferenceData { line, .. }) => assert_eq!(line, 1),
        other => panic!("Expected InvalidReferenceData, got {:?}", other),
    }

    let bad_feature = "\
{\"income\": 10, \"utilization\": 30, \"is_high_risk\": 0}
{\"income\": \"ten\", \"utilization\": 30, \"is_high_risk\": 0}
";
    match ReferenceDataset::from_reader(Cursor::new(bad_feature), small_schema(), "is_high_risk") {
        Err(RiskError::InvalidReferenceData { line, reason }) => {
            assert_eq!(line, 2);
            assert!(reason.contains("income"));
        }
        other => panic!("Expected InvalidReferenceData, got {:?}", other),
    }

    let bad_outcome = "{\"income\": 10, \"utilization\": 30, \"is_high_risk\": 2}\n";
    assert!(ReferenceDataset::from_reader(Cursor::new(bad_outcome), small_schema(), "is_high_risk").is_err());

    assert!(ReferenceDataset::from_reader(Cursor::new("\n\n"), small_schema(), "is_high_risk").is_err());
}

#[test]
fn test_save_and_load_credit_reference() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference").join("credit.jsonl");
    let schema = FeatureSchema::credit_default();
    let model = fixtures::credit_model();

    let rows: Vec<ReferenceRow> = fixtures::random_vectors(40, 8)
        .into_iter()
        .map(|features| {
            let high_risk = model.predict(&features).unwrap().is_high_risk();
            ReferenceRow { features, high_risk }
        })
        .collect();
    let original = ReferenceDataset::from_rows(schema.clone(), rows).unwrap();
    original.save_jsonl(&path).unwrap();

    let loaded = ReferenceDataset::load_jsonl(&path, schema).unwrap();
    assert_eq!(loaded.len(), 40);
    assert_eq!(loaded.stats().high_risk_count, original.stats().high_risk_count);
    for (a, b) in loaded.rows().iter().zip(original.rows()) {
        assert_eq!(a.features.values(), b.features.values());
    }
}

#[test]
fn test_rows_from_other_schema_rejected() {
    let other = FeatureSchema::new(1, &["a"]).unwrap();
    let row = ReferenceRow {
        features: other.validate(&record_from_pairs(&[("a", 1.0)])).unwrap(),
        high_risk: false,
    };
    assert!(ReferenceDataset::from_rows(small_schema(), vec![row]).is_err());
}
