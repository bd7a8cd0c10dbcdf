//! Path-dependent TreeSHAP over the boosted ensemble
//!
//! Exact Shapley values of the conditional expectation `E[f(x) | x_S]`,
//! where the expectation follows training cover down unknown branches.
//! Attributions are in margin space and satisfy
//! `base_value + Σ φ = margin` up to floating-point error.

use chrono::{DateTime, Utc};

use crate::logic::model::{ModelId, Node, RiskModel, Tree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// Precomputed per-model state (expected values per tree)
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    model_id: ModelId,
    fingerprint: String,
    base_value: f64,
    tree_expectations: Vec<f64>,
    built_at: DateTime<Utc>,
}

impl TreeExplainer {
    pub fn new(model: &RiskModel) -> Self {
        let tree_expectations: Vec<f64> = model.trees().iter().map(Tree::expected_value).collect();
        let base_value = model.base_margin() + tree_expectations.iter().sum::<f64>();

        Self {
            model_id: model.id(),
            fingerprint: model.fingerprint().to_string(),
            base_value,
            tree_expectations,
            built_at: Utc::now(),
        }
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Expected margin with no feature information
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn tree_expectations(&self) -> &[f64] {
        &self.tree_expectations
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// One attribution per schema feature, in schema order.
    ///
    /// `values` must already be aligned to `model`'s schema.
    pub fn shap_values(&self, model: &RiskModel, values: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; model.schema().len()];
        for tree in model.trees() {
            recurse(tree, 0, values, &mut phi, &[], 1.0, 1.0, None);
        }
        phi
    }
}

fn child_fractions(tree: &Tree, left: usize, right: usize) -> (f64, f64) {
    let left_cover = tree.node(left).map(Node::cover).unwrap_or(0.0);
    let right_cover = tree.node(right).map(Node::cover).unwrap_or(0.0);
    let total = left_cover + right_cover;
    (left_cover / total, right_cover / total)
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    index: usize,
    values: &[f64],
    phi: &mut [f64],
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match tree.node(index) {
        Some(Node::Leaf { value, .. }) => {
            for i in 1..path.len() {
                let weight = unwound_path_sum(&path, i);
                let element = path[i];
                if let Some(f) = element.feature {
                    phi[f] += weight * (element.one_fraction - element.zero_fraction) * value;
                }
            }
        }
        Some(Node::Split { feature: split, threshold, left, right, .. }) => {
            let (left_fraction, right_fraction) = child_fractions(tree, *left, *right);
            let (hot, hot_fraction, cold, cold_fraction) = if values[*split] < *threshold {
                (*left, left_fraction, *right, right_fraction)
            } else {
                (*right, right_fraction, *left, left_fraction)
            };

            // A feature already on the path is undone so it counts once
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path.iter().position(|e| e.feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(tree, hot, values, phi, &path, hot_fraction * incoming_zero, incoming_one, Some(*split));
            recurse(tree, cold, values, phi, &path, cold_fraction * incoming_zero, 0.0, Some(*split));
        }
        None => {}
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].weight += one_fraction * path[i].weight * (fi + 1.0) / (d + 1.0);
        path[i].weight = zero_fraction * path[i].weight * (d - fi) / (d + 1.0);
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].weight * zero_fraction * (d - fi) / (d + 1.0);
        } else {
            path[i].weight = path[i].weight * (d + 1.0) / (zero_fraction * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].weight - tmp * zero_fraction * (d - fi) / (d + 1.0);
        } else if zero_fraction != 0.0 {
            total += (path[i].weight / zero_fraction) / ((d - fi) / (d + 1.0));
        }
    }

    total
}
