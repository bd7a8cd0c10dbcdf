//! Shared test fixtures: a small hand-built credit ensemble and profiles.
//!
//! Margins (base score 0.5, so base margin 0):
//! - high-risk profile: 0.9 + 0.6 + 0.45 + 0.3 = 2.25
//! - high-risk profile with utilization 20: 0.2 + 0.2 + 0.45 - 0.05 = 0.8
//! - low-risk profile: -0.6 - 0.3 - 0.35 - 0.25 = -1.5

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::logic::features::{record_from_pairs, FeatureSchema, FeatureVector, RawRecord};
use crate::logic::model::{ModelMetadata, Node, RiskModel, Tree};

pub const UTILIZATION: usize = 0;
pub const CREDIT_AGE: usize = 1;
pub const HARD_INQUIRIES: usize = 2;
pub const PAYMENT_HISTORY: usize = 3;
pub const LATE_30: usize = 4;
pub const TOTAL_SPENDING: usize = 21;
pub const IMPULSE: usize = 23;

fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64, gain: f64) -> Node {
    Node::Split { feature, threshold, left, right, cover, gain }
}

fn leaf(value: f64, cover: f64) -> Node {
    Node::Leaf { value, cover }
}

pub fn credit_trees() -> Vec<Tree> {
    vec![
        Tree::new(vec![
            split(UTILIZATION, 30.0, 1, 2, 100.0, 40.0),
            split(PAYMENT_HISTORY, 90.0, 3, 4, 60.0, 10.0),
            split(HARD_INQUIRIES, 3.0, 5, 6, 40.0, 12.0),
            leaf(0.2, 20.0),
            leaf(-0.6, 40.0),
            leaf(0.3, 25.0),
            leaf(0.9, 15.0),
        ]),
        Tree::new(vec![
            split(TOTAL_SPENDING, 100.0, 1, 2, 100.0, 15.0),
            leaf(-0.3, 70.0),
            split(UTILIZATION, 60.0, 3, 4, 30.0, 8.0),
            leaf(0.2, 15.0),
            leaf(0.6, 15.0),
        ]),
        Tree::new(vec![
            split(LATE_30, 1.0, 1, 2, 100.0, 9.0),
            split(CREDIT_AGE, 24.0, 3, 4, 65.0, 5.0),
            leaf(0.45, 35.0),
            leaf(0.1, 25.0),
            leaf(-0.35, 40.0),
        ]),
        Tree::new(vec![
            split(UTILIZATION, 50.0, 1, 2, 100.0, 6.0),
            split(UTILIZATION, 20.0, 3, 4, 55.0, 2.0),
            split(IMPULSE, 50.0, 5, 6, 45.0, 3.0),
            leaf(-0.25, 30.0),
            leaf(-0.05, 25.0),
            leaf(0.1, 20.0),
            leaf(0.3, 25.0),
        ]),
    ]
}

/// Degenerate tree of `depth` splits on utilization, each with a leaf on the left
pub fn chain_tree(depth: usize) -> Tree {
    let mut nodes = Vec::with_capacity(2 * depth + 1);
    for level in 0..depth {
        let index = nodes.len();
        let cover = (depth - level + 1) as f64;
        nodes.push(split(UTILIZATION, level as f64, index + 1, index + 2, cover, 1.0));
        nodes.push(leaf(0.01, 1.0));
    }
    nodes.push(leaf(0.01, 1.0));
    Tree::new(nodes)
}

pub fn credit_model() -> RiskModel {
    RiskModel::new(
        FeatureSchema::credit_default(),
        credit_trees(),
        0.5,
        ModelMetadata::named("fixture-credit-gbdt"),
    )
    .unwrap()
}

pub fn shared_model() -> Arc<RiskModel> {
    Arc::new(credit_model())
}

/// Values for features the fixture trees never split on
fn neutral_pairs() -> Vec<(&'static str, f64)> {
    vec![
        ("late_60_days", 0.0),
        ("late_90_days", 0.0),
        ("num_credit_accounts", 4.0),
        ("total_credit_limit", 12000.0),
        ("current_balance", 3000.0),
        ("monthly_income", 4200.0),
        ("spending_groceries_pct", 12.0),
        ("spending_dining_pct", 6.0),
        ("spending_entertainment_pct", 4.0),
        ("spending_utilities_pct", 8.0),
        ("spending_transportation_pct", 7.0),
        ("spending_shopping_pct", 9.0),
        ("spending_healthcare_pct", 3.0),
        ("spending_travel_pct", 2.0),
        ("spending_subscriptions_pct", 1.5),
        ("spending_miscellaneous_pct", 2.5),
        ("spending_velocity", 95.0),
        ("recurring_payment_ratio", 0.6),
        ("onetime_payment_ratio", 0.4),
        ("payment_consistency", 70.0),
        ("payment_timing_variance", 4.0),
        ("min_payment_frequency", 20.0),
        ("avg_days_before_due", 3.0),
    ]
}

pub fn high_risk_record() -> RawRecord {
    let mut pairs = neutral_pairs();
    pairs.extend([
        ("credit_utilization", 85.5),
        ("credit_age_months", 18.5),
        ("hard_inquiries", 6.0),
        ("payment_history_pct", 75.0),
        ("late_30_days", 2.0),
        ("total_spending_pct", 110.0),
        ("impulse_spending_score", 65.0),
    ]);
    record_from_pairs(&pairs)
}

pub fn low_risk_record() -> RawRecord {
    let mut pairs = neutral_pairs();
    pairs.extend([
        ("credit_utilization", 10.0),
        ("credit_age_months", 60.0),
        ("hard_inquiries", 0.0),
        ("payment_history_pct", 98.0),
        ("late_30_days", 0.0),
        ("total_spending_pct", 80.0),
        ("impulse_spending_score", 20.0),
    ]);
    record_from_pairs(&pairs)
}

pub fn high_risk_vector() -> FeatureVector {
    FeatureSchema::credit_default().validate(&high_risk_record()).unwrap()
}

pub fn low_risk_vector() -> FeatureVector {
    FeatureSchema::credit_default().validate(&low_risk_record()).unwrap()
}

/// Deterministic random profiles spanning both sides of every fixture split
pub fn random_records(n: usize, seed: u64) -> Vec<RawRecord> {
    let schema = FeatureSchema::credit_default();
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n)
        .map(|_| {
            let pairs: Vec<(String, f64)> = schema
                .names()
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = match i {
                        UTILIZATION => rng.gen_range(0.0..100.0),
                        CREDIT_AGE => rng.gen_range(1.0..120.0),
                        HARD_INQUIRIES | LATE_30 => rng.gen_range(0..6) as f64,
                        PAYMENT_HISTORY => rng.gen_range(60.0..100.0),
                        TOTAL_SPENDING => rng.gen_range(50.0..150.0),
                        IMPULSE => rng.gen_range(0.0..100.0),
                        _ => rng.gen_range(0.0..50.0),
                    };
                    (name.clone(), value)
                })
                .collect();
            record_from_pairs(&pairs)
        })
        .collect()
}

pub fn random_vectors(n: usize, seed: u64) -> Vec<FeatureVector> {
    let schema = FeatureSchema::credit_default();
    random_records(n, seed)
        .iter()
        .map(|r| schema.validate(r).unwrap())
        .collect()
}
