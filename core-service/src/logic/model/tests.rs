//! Model scoring, importance and artifact tests

use std::sync::Arc;

use crate::constants::RISK_THRESHOLD;
use crate::logic::error::{RiskError, ValidationError};
use crate::logic::features::{FeatureSchema, CREDIT_FEATURE_COUNT};
use crate::logic::fixtures::{self, credit_model};
use crate::logic::model::{
    ImportanceKind, ModelMetadata, ModelSlot, Node, RiskLabel, RiskModel, Tree, MAX_TREE_DEPTH,
};

// ============================================================================
// SCORING
// ============================================================================

#[test]
fn test_high_risk_profile() {
    let model = credit_model();
    let prediction = model.predict(&fixtures::high_risk_vector()).unwrap();

    assert!((prediction.margin() - 2.25).abs() < 1e-12);
    assert!((prediction.probability() - 0.904650535).abs() < 1e-6);
    assert_eq!(prediction.label(), RiskLabel::HighRisk);
}

#[test]
fn test_low_risk_profile() {
    let model = credit_model();
    let prediction = model.predict(&fixtures::low_risk_vector()).unwrap();

    assert!((prediction.margin() + 1.5).abs() < 1e-12);
    assert_eq!(prediction.label(), RiskLabel::LowRisk);
}

#[test]
fn test_label_matches_probability_threshold() {
    let model = credit_model();
    for vector in fixtures::random_vectors(100, 7) {
        let p = model.predict(&vector).unwrap();
        assert!((0.0..=1.0).contains(&p.probability()));
        assert_eq!(p.label() == RiskLabel::HighRisk, p.probability() > RISK_THRESHOLD);
    }
}

#[test]
fn test_predict_record_validates_first() {
    let model = credit_model();
    let mut record = fixtures::high_risk_record();
    record.remove("hard_inquiries");

    match model.predict_record(&record) {
        Err(RiskError::Validation(ValidationError::MissingFeatures(missing))) => {
            assert_eq!(missing, vec!["hard_inquiries".to_string()]);
        }
        other => panic!("Expected MissingFeatures, got {:?}", other),
    }
}

#[test]
fn test_predict_batch_isolates_failures() {
    let model = credit_model();
    let mut records = fixtures::random_records(5, 3);
    records[2].remove("late_30_days");

    let results = model.predict_batch(&records);
    assert_eq!(results.len(), 5);
    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    assert!(results[2].is_err());

    // Same answers as scoring one at a time
    for (record, result) in records.iter().zip(&results) {
        if let Ok(p) = result {
            assert_eq!(p.margin(), model.predict_record(record).unwrap().margin());
        }
    }
}

#[test]
fn test_vector_from_reordered_schema_is_realigned() {
    let model = credit_model();
    let mut reversed: Vec<String> = FeatureSchema::credit_default().names().to_vec();
    reversed.reverse();
    let other = FeatureSchema::new(1, reversed.as_slice()).unwrap();

    let vector = other.validate(&fixtures::high_risk_record()).unwrap();
    assert!(!vector.is_compatible(model.schema()));
    assert!((model.predict_margin(&vector).unwrap() - 2.25).abs() < 1e-12);
}

#[test]
fn test_vector_from_foreign_schema_rejected() {
    let model = credit_model();
    let other = FeatureSchema::new(1, &["credit_utilization", "mystery"]).unwrap();
    let vector = other
        .validate(&crate::logic::features::record_from_pairs(&[
            ("credit_utilization", 1.0),
            ("mystery", 2.0),
        ]))
        .unwrap();

    assert!(matches!(
        model.predict(&vector),
        Err(RiskError::SchemaMismatch { .. })
    ));
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_invalid_models_rejected() {
    let schema = FeatureSchema::credit_default();

    let no_trees = RiskModel::new(schema.clone(), vec![], 0.5, ModelMetadata::named("x"));
    assert!(matches!(no_trees, Err(RiskError::CorruptArtifact(_))));

    let bad_base = RiskModel::new(schema.clone(), fixtures::credit_trees(), 1.0, ModelMetadata::named("x"));
    assert!(matches!(bad_base, Err(RiskError::CorruptArtifact(_))));

    let bad_feature = Tree::new(vec![
        Node::Split { feature: 99, threshold: 1.0, left: 1, right: 2, cover: 2.0, gain: 1.0 },
        Node::Leaf { value: 0.0, cover: 1.0 },
        Node::Leaf { value: 0.0, cover: 1.0 },
    ]);
    let out_of_range = RiskModel::new(schema, vec![bad_feature], 0.5, ModelMetadata::named("x"));
    assert!(matches!(out_of_range, Err(RiskError::CorruptArtifact(_))));
}

#[test]
fn test_each_instance_has_own_id_same_fingerprint() {
    let a = credit_model();
    let b = credit_model();
    assert_ne!(a.id(), b.id());
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 64);
}

#[test]
fn test_model_slot() {
    let slot = ModelSlot::empty();
    assert!(matches!(slot.current(), Err(RiskError::ModelNotLoaded)));
    assert!(!slot.is_loaded());

    let model = Arc::new(credit_model());
    assert!(slot.replace(Arc::clone(&model)).is_none());
    assert_eq!(slot.current().unwrap().id(), model.id());

    let next = Arc::new(credit_model());
    let previous = slot.replace(next.clone()).unwrap();
    assert_eq!(previous.id(), model.id());
    assert_eq!(slot.current().unwrap().id(), next.id());

    slot.clear();
    assert!(matches!(slot.current(), Err(RiskError::ModelNotLoaded)));
}

// ============================================================================
// IMPORTANCE
// ============================================================================

#[test]
fn test_gain_importance_ranking() {
    let model = credit_model();
    let ranking = model.feature_importance(ImportanceKind::Gain);

    assert_eq!(ranking.len(), CREDIT_FEATURE_COUNT);
    let total: f64 = ranking.iter().map(|r| r.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);

    // Average gains: total_spending 15, utilization (40+8+6+2)/4 = 14,
    // hard_inquiries 12, payment_history 10, late_30 9, credit_age 5, impulse 3
    let top: Vec<&str> = ranking.iter().take(7).map(|r| r.feature.as_str()).collect();
    assert_eq!(
        top,
        vec![
            "total_spending_pct",
            "credit_utilization",
            "hard_inquiries",
            "payment_history_pct",
            "late_30_days",
            "credit_age_months",
            "impulse_spending_score",
        ]
    );

    for (i, row) in ranking.iter().enumerate() {
        assert_eq!(row.rank, i + 1);
    }

    // Unused features are zero, in schema order
    assert_eq!(ranking[7].feature, "late_60_days");
    assert_eq!(ranking[7].importance, 0.0);
}

#[test]
fn test_weight_and_total_gain() {
    let model = credit_model();

    let weight = model.feature_importance(ImportanceKind::Weight);
    assert_eq!(weight[0].feature, "credit_utilization");
    assert!((weight[0].importance - 4.0 / 10.0).abs() < 1e-12);

    let total_gain = model.feature_importance(ImportanceKind::TotalGain);
    assert_eq!(total_gain[0].feature, "credit_utilization");
}

#[test]
fn test_feature_statistics_subset() {
    let model = credit_model();
    let stats = model.feature_statistics(&["hard_inquiries", "nope", "credit_utilization"]);

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].feature, "hard_inquiries");
    assert_eq!(stats[0].rank, 3);
    assert_eq!(stats[1].rank, 2);
}

// ============================================================================
// ARTIFACT
// ============================================================================

#[test]
fn test_save_load_round_trip_is_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("credit.json");

    let model = credit_model();
    model.save(&path).unwrap();
    let loaded = RiskModel::load(&path, Some(&FeatureSchema::credit_default())).unwrap();

    assert_ne!(loaded.id(), model.id());
    assert_eq!(loaded.fingerprint(), model.fingerprint());
    assert_eq!(loaded.metadata(), model.metadata());

    for vector in fixtures::random_vectors(50, 42) {
        let before = model.predict(&vector).unwrap();
        let after = loaded.predict(&vector).unwrap();
        assert_eq!(before.margin().to_bits(), after.margin().to_bits());
        assert_eq!(before.label(), after.label());
    }
}

#[test]
fn test_load_detects_tampering() {
    let model = credit_model();
    let bytes = model.to_bytes().unwrap();
    let mut envelope: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    envelope["payload"]["base_score"] = serde_json::json!(0.9);
    let tampered = serde_json::to_vec(&envelope).unwrap();

    match RiskModel::from_bytes(&tampered, None) {
        Err(RiskError::CorruptArtifact(reason)) => assert!(reason.contains("checksum")),
        other => panic!("Expected CorruptArtifact, got {:?}", other),
    }
}

#[test]
fn test_load_rejects_garbage_and_unknown_format() {
    assert!(matches!(
        RiskModel::from_bytes(b"not json at all", None),
        Err(RiskError::CorruptArtifact(_))
    ));

    let mut envelope: serde_json::Value =
        serde_json::from_slice(&credit_model().to_bytes().unwrap()).unwrap();
    envelope["format"] = serde_json::json!("pickle");
    assert!(matches!(
        RiskModel::from_bytes(&serde_json::to_vec(&envelope).unwrap(), None),
        Err(RiskError::CorruptArtifact(_))
    ));
}

#[test]
fn test_load_with_other_expected_schema() {
    let bytes = credit_model().to_bytes().unwrap();

    let mut names: Vec<String> = FeatureSchema::credit_default().names().to_vec();
    names[5] = "late_45_days".to_string();
    let expected = FeatureSchema::new(1, names.as_slice()).unwrap();

    match RiskModel::from_bytes(&bytes, Some(&expected)) {
        Err(RiskError::SchemaMismatch { missing, unexpected }) => {
            assert_eq!(missing, vec!["late_45_days".to_string()]);
            assert_eq!(unexpected, vec!["late_60_days".to_string()]);
        }
        other => panic!("Expected SchemaMismatch, got {:?}", other),
    }
}

#[test]
fn test_load_rejects_overly_deep_tree() {
    use sha2::{Digest, Sha256};

    let mut envelope: serde_json::Value =
        serde_json::from_slice(&credit_model().to_bytes().unwrap()).unwrap();
    envelope["payload"]["trees"][0] = serde_json::to_value(fixtures::chain_tree(20_000)).unwrap();
    let payload = serde_json::to_vec(&envelope["payload"]).unwrap();
    envelope["checksum"] = serde_json::json!(hex::encode(Sha256::digest(&payload)));

    match RiskModel::from_bytes(&serde_json::to_vec(&envelope).unwrap(), None) {
        Err(RiskError::CorruptArtifact(reason)) => {
            assert!(reason.contains(&MAX_TREE_DEPTH.to_string()));
        }
        other => panic!("Expected CorruptArtifact, got {:?}", other.map(|m| m.n_trees())),
    }
}

#[test]
fn test_load_missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        RiskModel::load(&dir.path().join("absent.json"), None),
        Err(RiskError::Io(_))
    ));
}
