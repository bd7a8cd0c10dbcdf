//! Analyzer - PredictionContext assembly
//!
//! validate → predict → explain → additivity check → population
//! comparison, in that order. Validation failures return before the
//! model or explainer is touched.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::constants;
use crate::logic::config::AnalysisConfig;
use crate::logic::dataset::{ReferenceDataset, SimilarProfile};
use crate::logic::error::{RiskError, RiskResult};
use crate::logic::explain::{check_additivity, CohortAnalysis, Explainer};
use crate::logic::features::{FeatureSchema, FeatureVector, RawRecord};
use crate::logic::model::{ImportanceKind, ModelSlot, RiskModel, RiskPrediction};
use super::types::PredictionContext;

#[derive(Debug)]
pub struct Analyzer {
    models: ModelSlot,
    explainer: Explainer,
    reference: RwLock<Option<Arc<ReferenceDataset>>>,
    config: AnalysisConfig,
}

impl Analyzer {
    /// Analyzer with no model yet (every call fails with `ModelNotLoaded`)
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            models: ModelSlot::empty(),
            explainer: Explainer::new(),
            reference: RwLock::new(None),
            config,
        }
    }

    pub fn with_model(model: Arc<RiskModel>, config: AnalysisConfig) -> Self {
        let analyzer = Self::new(config);
        analyzer.models.replace(Arc::clone(&model));
        analyzer.explainer.attach(&model);
        analyzer
    }

    /// Load an artifact built for the credit layout
    pub fn load(path: &Path, config: AnalysisConfig) -> RiskResult<Self> {
        let model = RiskModel::load(path, Some(&FeatureSchema::credit_default()))?;
        Ok(Self::with_model(Arc::new(model), config))
    }

    /// Load the model and, when the file exists, the reference dataset
    pub fn open(model_path: &Path, reference_path: &Path, config: AnalysisConfig) -> RiskResult<Self> {
        let analyzer = Self::load(model_path, config)?;
        if reference_path.exists() {
            let dataset = ReferenceDataset::load_jsonl(reference_path, FeatureSchema::credit_default())?;
            log::info!("Reference dataset: {} rows from {}", dataset.len(), reference_path.display());
            analyzer.set_reference(Arc::new(dataset))?;
        } else {
            log::info!("No reference dataset at {}", reference_path.display());
        }
        Ok(analyzer)
    }

    /// `open` with the paths from `CREDIT_RISK_MODEL_PATH` / `CREDIT_RISK_REFERENCE_PATH`
    pub fn from_env(config: AnalysisConfig) -> RiskResult<Self> {
        Self::open(&constants::get_model_path(), &constants::get_reference_path(), config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn model(&self) -> RiskResult<Arc<RiskModel>> {
        self.models.current()
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    /// Swap the shared model; the new one must cover the same feature set
    /// as the current model and the attached reference dataset
    pub fn replace_model(&self, model: Arc<RiskModel>) -> RiskResult<()> {
        if let Ok(current) = self.models.current() {
            model.schema().reconcile(current.schema())?;
        }
        if let Some(reference) = self.reference() {
            reference.schema().reconcile(model.schema())?;
        }
        self.models.replace(Arc::clone(&model));
        // Rebinding the explainer invalidates the cached one
        self.explainer.attach(&model);
        Ok(())
    }

    /// Attach a reference population; its feature set must match the loaded model
    pub fn set_reference(&self, dataset: Arc<ReferenceDataset>) -> RiskResult<()> {
        if let Ok(model) = self.models.current() {
            dataset.schema().reconcile(model.schema())?;
        }
        *self.reference.write() = Some(dataset);
        Ok(())
    }

    pub fn reference(&self) -> Option<Arc<ReferenceDataset>> {
        self.reference.read().clone()
    }

    // ========================================================================
    // ANALYSIS
    // ========================================================================

    /// Validate and analyze a raw record.
    ///
    /// `population` overrides the attached reference dataset.
    pub fn analyze(
        &self,
        record: &RawRecord,
        population: Option<&ReferenceDataset>,
    ) -> RiskResult<PredictionContext> {
        let model = self.model()?;
        let vector = model.schema().validate(record)?;
        self.assemble(&model, vector, population)
    }

    /// Analyze an already validated vector
    pub fn analyze_vector(
        &self,
        vector: &FeatureVector,
        population: Option<&ReferenceDataset>,
    ) -> RiskResult<PredictionContext> {
        let model = self.model()?;
        self.assemble(&model, vector.clone(), population)
    }

    fn assemble(
        &self,
        model: &RiskModel,
        vector: FeatureVector,
        population: Option<&ReferenceDataset>,
    ) -> RiskResult<PredictionContext> {
        let prediction = model.predict(&vector)?;
        let explanation = self.explainer.explain(model, &vector)?;

        let mut consistency = check_additivity(&explanation, self.config.additivity_tolerance);
        if explanation.margin != prediction.margin() {
            consistency.consistent = false;
        }
        if !consistency.consistent {
            if self.config.strict_consistency {
                log::error!(
                    "Additivity violated for model {}: error {:.3e}",
                    model.id(),
                    consistency.error
                );
                return Err(RiskError::InconsistentExplanation {
                    base_value: consistency.base_value,
                    reconstructed: consistency.reconstructed,
                    margin: prediction.margin(),
                });
            }
            log::warn!(
                "Additivity violated for model {} (error {:.3e}); context flagged",
                model.id(),
                consistency.error
            );
        }

        let reference = self.reference();
        let population = match population.or(reference.as_deref()) {
            Some(dataset) => Some(dataset.compare(&vector)?),
            None => None,
        };

        let top_contributions = explanation.top(self.config.top_k).to_vec();

        Ok(PredictionContext {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            model_id: model.id(),
            band: prediction.band(),
            features: vector,
            prediction,
            explanation,
            top_contributions,
            population,
            feature_statistics: model.feature_importance(ImportanceKind::Gain),
            consistency,
        })
    }

    /// Score many records; failures stay per record
    pub fn analyze_batch(&self, records: &[RawRecord]) -> RiskResult<Vec<RiskResult<RiskPrediction>>> {
        let model = self.model()?;
        Ok(model.predict_batch(records))
    }

    // ========================================================================
    // POPULATION
    // ========================================================================

    /// Cohort comparison over a reference population
    pub fn cohort_analysis(
        &self,
        population: Option<&ReferenceDataset>,
        threshold: f64,
    ) -> RiskResult<CohortAnalysis> {
        let model = self.model()?;
        let attached = self.reference();
        let dataset = population.or(attached.as_deref()).ok_or_else(no_reference)?;
        self.explainer.cohort_analysis(&model, &dataset.vectors(), threshold)
    }

    /// Nearest reference profiles to the context's applicant
    pub fn similar_profiles(&self, context: &PredictionContext, n: usize) -> RiskResult<Vec<SimilarProfile>> {
        let dataset = self.reference().ok_or_else(no_reference)?;
        dataset.similar_profiles(&context.features, n)
    }
}

fn no_reference() -> RiskError {
    RiskError::InvalidReferenceData {
        line: 0,
        reason: "no reference dataset attached".to_string(),
    }
}
