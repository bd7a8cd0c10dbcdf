//! Explainer - per-model TreeSHAP cache
//!
//! Building a `TreeExplainer` walks every tree once; it is done at most
//! once per bound model and shared read-only afterwards. Binding a model
//! with a different `ModelId` invalidates the cached explainer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::FeatureVector;
use crate::logic::model::RiskModel;
use super::treeshap::TreeExplainer;
use super::types::{Explanation, FeatureContribution};

#[derive(Debug, Default)]
pub struct Explainer {
    cached: RwLock<Option<Arc<TreeExplainer>>>,
    constructions: AtomicU64,
}

impl Explainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `model`, building its explainer only if not already cached
    pub fn attach(&self, model: &RiskModel) -> Arc<TreeExplainer> {
        if let Some(existing) = self.cached.read().as_ref() {
            if existing.model_id() == model.id() {
                return Arc::clone(existing);
            }
        }

        let mut slot = self.cached.write();
        // Another caller may have built it while we waited for the lock
        if let Some(existing) = slot.as_ref() {
            if existing.model_id() == model.id() {
                return Arc::clone(existing);
            }
            log::info!(
                "Invalidating explainer for model {} (now bound to {})",
                existing.model_id(),
                model.id()
            );
        }

        let built = Arc::new(TreeExplainer::new(model));
        self.constructions.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "Explainer built for model {} (base value {:.6})",
            model.id(),
            built.base_value()
        );

        *slot = Some(Arc::clone(&built));
        built
    }

    /// Currently bound explainer, if any
    pub fn current(&self) -> Option<Arc<TreeExplainer>> {
        self.cached.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.cached.read().is_some()
    }

    /// Drop the cached explainer
    pub fn invalidate(&self) {
        if self.cached.write().take().is_some() {
            log::debug!("Explainer cache cleared");
        }
    }

    /// Number of explainer builds so far
    pub fn constructions(&self) -> u64 {
        self.constructions.load(Ordering::Relaxed)
    }

    /// Explain one prediction of `model`.
    ///
    /// Fails with `ExplainerNotReady` until a model has been attached; a
    /// different model rebinds the cache.
    pub fn explain(&self, model: &RiskModel, vector: &FeatureVector) -> RiskResult<Explanation> {
        let explainer = match self.current() {
            None => return Err(RiskError::ExplainerNotReady),
            Some(existing) if existing.model_id() == model.id() => existing,
            Some(_) => self.attach(model),
        };

        let values = model.aligned_values(vector)?;
        let phi = explainer.shap_values(model, &values);
        let margin = model.margin_of(&values);

        let mut contributions: Vec<FeatureContribution> = model
            .schema()
            .names()
            .iter()
            .zip(values.iter())
            .zip(phi.iter())
            .map(|((name, value), attribution)| FeatureContribution::new(name, *value, *attribution))
            .collect();
        // Stable: ties keep schema order
        contributions.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Ok(Explanation {
            model_id: model.id(),
            base_value: explainer.base_value(),
            margin,
            contributions,
        })
    }

    /// Schema-ordered attributions only (no ranking)
    pub fn attributions(&self, model: &RiskModel, vector: &FeatureVector) -> RiskResult<Vec<f64>> {
        let explainer = self.current().ok_or(RiskError::ExplainerNotReady)?;
        let explainer = if explainer.model_id() == model.id() {
            explainer
        } else {
            self.attach(model)
        };
        let values = model.aligned_values(vector)?;
        Ok(explainer.shap_values(model, &values))
    }
}
