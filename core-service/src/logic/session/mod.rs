//! Session Module - per-caller conversation with a bound analysis
//!
//! One `AnalysisSession` serves one caller. Its mutable state (conversation
//! and bound context) sits behind a single mutex that every operation holds
//! for its whole duration, narrative call included. The analyzer it uses is
//! shared between sessions.

pub mod conversation;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::logic::config::NarrativeConfig;
use crate::logic::context::{Analyzer, PredictionContext, ScenarioOutcome};
use crate::logic::error::{RiskError, RiskResult, ValidationError};
use crate::logic::explain::FeatureContribution;
use crate::logic::features::RawRecord;
use crate::logic::model::{FeatureImportance, RiskLabel};
use crate::logic::narrative::{self, prompt, ChatRole, NarrativeAdapter, NarrativeRequest};

pub use conversation::{ConversationState, Turn, TurnKind};

/// Contributions included in an exported report
const REPORT_TOP_FEATURES: usize = 10;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Generated text, or why there is none
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Narrative {
    Text(String),
    Unavailable(String),
}

impl Narrative {
    pub fn text(&self) -> Option<&str> {
        match self {
            Narrative::Text(text) => Some(text),
            Narrative::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Narrative::Text(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalysis {
    pub context: Arc<PredictionContext>,
    pub narrative: Narrative,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub label: RiskLabel,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureInsight {
    pub feature: String,
    pub value: f64,
    pub attribution: f64,
    pub statistics: Option<FeatureImportance>,
    pub narrative: Narrative,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub outcome: ScenarioOutcome,
    pub narrative: Narrative,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    /// Positive-attribution entries of the top contributions
    pub risk_factors: Vec<FeatureContribution>,
    pub label: RiskLabel,
    pub narrative: Narrative,
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub context: Arc<PredictionContext>,
    pub top_features: Vec<FeatureContribution>,
    pub conversation: Vec<Turn>,
    pub exported_at: DateTime<Utc>,
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Default)]
struct SessionState {
    conversation: ConversationState,
    context: Option<Arc<PredictionContext>>,
}

impl SessionState {
    fn bound(&self) -> RiskResult<Arc<PredictionContext>> {
        self.context.clone().ok_or(RiskError::NoActiveAnalysis)
    }
}

pub struct AnalysisSession {
    id: Uuid,
    analyzer: Arc<Analyzer>,
    narrator: Arc<dyn NarrativeAdapter>,
    config: NarrativeConfig,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("id", &self.id)
            .field("narrator_available", &self.narrator.is_available())
            .finish()
    }
}

impl AnalysisSession {
    pub fn new(
        analyzer: Arc<Analyzer>,
        narrator: Arc<dyn NarrativeAdapter>,
        config: NarrativeConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        log::debug!("Session {} opened", id);
        Self {
            id,
            analyzer,
            narrator,
            config,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Session whose narrator is picked from `config`
    pub fn from_config(analyzer: Arc<Analyzer>, config: NarrativeConfig) -> Self {
        let narrator = narrative::from_config(&config);
        Self::new(analyzer, narrator, config)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    fn request(&self, context: &PredictionContext, user_prompt: String, max_tokens: u32) -> NarrativeRequest {
        NarrativeRequest::new(
            prompt::system_prompt(context),
            user_prompt,
            max_tokens,
            self.config.timeout(),
        )
    }

    fn narrate(&self, request: &NarrativeRequest) -> Narrative {
        match self.narrator.generate(request) {
            Ok(text) => Narrative::Text(text),
            Err(e) => {
                log::warn!("Session {}: {}", self.id, e);
                Narrative::Unavailable(e.to_string())
            }
        }
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Score `record` and bind the result to this session.
    ///
    /// The context stays bound when the narrative fails. A record that
    /// fails validation leaves the previous binding in place.
    pub fn analyze(&self, record: &RawRecord) -> RiskResult<SessionAnalysis> {
        let mut state = self.state.lock();

        let context = Arc::new(self.analyzer.analyze(record, None)?);
        state.context = Some(Arc::clone(&context));

        let request = self.request(&context, prompt::analysis_prompt(&context), prompt::ANALYSIS_MAX_TOKENS);
        let narrative = self.narrate(&request);
        if let Narrative::Text(text) = &narrative {
            state.conversation.push(ChatRole::Assistant, TurnKind::Analysis, text.as_str());
        }

        log::info!(
            "Session {}: {} ({:.3})",
            self.id,
            context.prediction.label(),
            context.probability()
        );

        Ok(SessionAnalysis { context, narrative })
    }

    /// Free-form question about the bound analysis.
    ///
    /// Turns are recorded only when an answer was produced.
    pub fn ask(&self, question: &str) -> RiskResult<Answer> {
        let mut state = self.state.lock();
        let context = state.bound()?;

        let request = self
            .request(&context, question.to_string(), prompt::QUESTION_MAX_TOKENS)
            .with_history(state.conversation.history_messages(self.config.history_window));
        let answer = self.narrator.generate(&request)?;

        state.conversation.push(ChatRole::User, TurnKind::Question, question);
        state.conversation.push(ChatRole::Assistant, TurnKind::Answer, answer.as_str());

        Ok(Answer {
            question: question.to_string(),
            answer,
            label: context.prediction.label(),
            probability: context.probability(),
        })
    }

    pub fn explain_feature(&self, feature: &str) -> RiskResult<FeatureInsight> {
        let mut state = self.state.lock();
        let context = state.bound()?;

        let (value, user_prompt) = match (context.features.get(feature), prompt::feature_prompt(&context, feature)) {
            (Some(value), Some(user_prompt)) => (value, user_prompt),
            _ => {
                return Err(ValidationError::UnknownFeatures(vec![feature.to_string()]).into());
            }
        };

        let narrative = self.narrate(&self.request(&context, user_prompt, prompt::FEATURE_MAX_TOKENS));
        if let Narrative::Text(text) = &narrative {
            state.conversation.push(ChatRole::Assistant, TurnKind::Feature, text.as_str());
        }

        Ok(FeatureInsight {
            feature: feature.to_string(),
            value,
            attribution: context
                .explanation
                .contribution(feature)
                .map(|c| c.attribution)
                .unwrap_or(0.0),
            statistics: context.importance(feature).cloned(),
            narrative,
        })
    }

    /// Project the bound analysis under `changes`; the binding is unchanged
    pub fn simulate(&self, changes: &BTreeMap<String, f64>) -> RiskResult<ScenarioReport> {
        let mut state = self.state.lock();
        let context = state.bound()?;

        let outcome = self.analyzer.project(&context, changes)?;

        let user_prompt = prompt::scenario_prompt(&context, &outcome);
        let narrative = self.narrate(&self.request(&context, user_prompt, prompt::SCENARIO_MAX_TOKENS));
        if let Narrative::Text(text) = &narrative {
            state.conversation.push(ChatRole::Assistant, TurnKind::Scenario, text.as_str());
        }

        Ok(ScenarioReport { outcome, narrative })
    }

    pub fn recommendations(&self) -> RiskResult<Recommendations> {
        let mut state = self.state.lock();
        let context = state.bound()?;

        let risk_factors: Vec<FeatureContribution> =
            context.risk_factors().into_iter().cloned().collect();

        let request = self
            .request(&context, prompt::recommendation_prompt(&context), prompt::RECOMMENDATION_MAX_TOKENS)
            .with_history(state.conversation.history_messages(self.config.history_window));
        let narrative = self.narrate(&request);
        if let Narrative::Text(text) = &narrative {
            state.conversation.push(ChatRole::Assistant, TurnKind::Recommendation, text.as_str());
        }

        Ok(Recommendations {
            risk_factors,
            label: context.prediction.label(),
            narrative,
        })
    }

    // ========================================================================
    // STATE
    // ========================================================================

    pub fn history(&self) -> Vec<Turn> {
        self.state.lock().conversation.turns().to_vec()
    }

    pub fn context(&self) -> Option<Arc<PredictionContext>> {
        self.state.lock().context.clone()
    }

    pub fn export_report(&self) -> RiskResult<SessionReport> {
        let state = self.state.lock();
        let context = state.bound()?;

        Ok(SessionReport {
            session_id: self.id,
            top_features: context
                .explanation
                .top(REPORT_TOP_FEATURES)
                .to_vec(),
            context,
            conversation: state.conversation.turns().to_vec(),
            exported_at: Utc::now(),
        })
    }

    /// Clear the conversation and unbind the context in one step
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.conversation.clear();
        state.context = None;
        log::debug!("Session {} reset", self.id);
    }
}
