//! Narrative Module - external text generation
//!
//! Everything that turns a `PredictionContext` into prose goes through
//! `NarrativeAdapter`. The engines never depend on a concrete provider;
//! sessions hold an `Arc<dyn NarrativeAdapter>`.

pub mod client;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logic::config::NarrativeConfig;
use crate::logic::error::RiskError;

pub use client::ChatCompletionClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One generation call
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    /// System prompt with the context block
    pub system: String,
    /// Earlier turns, oldest first
    pub history: Vec<ChatMessage>,
    pub prompt: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl NarrativeRequest {
    pub fn new(system: String, prompt: String, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            system,
            history: Vec::new(),
            prompt,
            max_tokens,
            timeout,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// system, history..., user prompt
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::new(ChatRole::System, self.system.as_str()));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::new(ChatRole::User, self.prompt.as_str()));
        messages
    }
}

/// Text-generation boundary.
///
/// Implementations must turn every failure (timeout included) into
/// `RiskError::NarrativeUnavailable`.
pub trait NarrativeAdapter: Send + Sync {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, RiskError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Adapter used when no provider is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNarrator;

impl NarrativeAdapter for DisabledNarrator {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String, RiskError> {
        Err(RiskError::NarrativeUnavailable(
            "no narrative provider configured".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// HTTP client when an API key is set, otherwise `DisabledNarrator`
pub fn from_config(config: &NarrativeConfig) -> Arc<dyn NarrativeAdapter> {
    if config.is_configured() {
        log::info!("Narrative provider: {} ({})", config.endpoint, config.model);
        Arc::new(ChatCompletionClient::new(config.clone()))
    } else {
        Arc::new(DisabledNarrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_order() {
        let request = NarrativeRequest::new(
            "sys".to_string(),
            "question".to_string(),
            800,
            Duration::from_secs(5),
        )
        .with_history(vec![
            ChatMessage::new(ChatRole::User, "q1"),
            ChatMessage::new(ChatRole::Assistant, "a1"),
        ]);

        let roles: Vec<ChatRole> = request.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(request.messages().last().unwrap().content, "question");
    }

    #[test]
    fn test_disabled_narrator() {
        let request = NarrativeRequest::new(String::new(), String::new(), 10, Duration::from_secs(1));
        let err = DisabledNarrator.generate(&request).unwrap_err();
        assert_eq!(err.kind(), "narrative_unavailable");
        assert!(!DisabledNarrator.is_available());
    }

    #[test]
    fn test_from_config_without_key_is_disabled() {
        let adapter = from_config(&NarrativeConfig::default());
        assert!(!adapter.is_available());

        let configured = NarrativeConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(from_config(&configured).is_available());
    }
}
