//! Chat-completions client (OpenAI-compatible, blocking)
//!
//! - The `NarrativeRequest` timeout bounds the whole call, retries included
//! - Bounded retries with linear backoff on transport errors, 429 and 5xx
//! - Every failure surfaces as `RiskError::NarrativeUnavailable`

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;

use crate::logic::config::NarrativeConfig;
use crate::logic::error::RiskError;
use super::{NarrativeAdapter, NarrativeRequest};

const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    config: NarrativeConfig,
    backoff: Duration,
}

/// Outcome of one HTTP attempt
enum Attempt {
    Done(String),
    Retry(String),
    Fatal(String),
}

impl ChatCompletionClient {
    pub fn new(config: NarrativeConfig) -> Self {
        Self {
            config,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Base delay; attempt `n` waits `n * backoff`
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &NarrativeConfig {
        &self.config
    }

    fn request_body(&self, request: &NarrativeRequest) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": request.messages(),
            "temperature": self.config.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn attempt(&self, api_key: &str, body: &serde_json::Value, timeout: Duration) -> Attempt {
        let response = ureq::post(&self.config.endpoint)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", api_key))
            .timeout(timeout)
            .send_json(body);

        match response {
            Ok(resp) => match resp.into_json::<CompletionResponse>() {
                Ok(parsed) => match first_content(parsed) {
                    Some(text) => Attempt::Done(text),
                    None => Attempt::Fatal("empty completion".to_string()),
                },
                Err(e) => Attempt::Fatal(format!("malformed completion: {}", e)),
            },
            Err(ureq::Error::Status(code, _)) if is_retryable_status(code) => {
                Attempt::Retry(format!("HTTP {}", code))
            }
            Err(ureq::Error::Status(code, _)) => Attempt::Fatal(format!("HTTP {}", code)),
            Err(ureq::Error::Transport(e)) => Attempt::Retry(e.to_string()),
        }
    }
}

impl NarrativeAdapter for ChatCompletionClient {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, RiskError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| RiskError::NarrativeUnavailable("API key not configured".to_string()))?;

        let body = self.request_body(request);
        let attempts = self.config.max_retries + 1;
        let deadline = Instant::now() + request.timeout;
        let mut made = 0;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            made = attempt;

            match self.attempt(api_key, &body, remaining) {
                Attempt::Done(text) => {
                    log::debug!("Narrative generated ({} chars, attempt {})", text.len(), attempt);
                    return Ok(text);
                }
                Attempt::Fatal(reason) => {
                    log::error!("Narrative request failed: {}", reason);
                    return Err(RiskError::NarrativeUnavailable(reason));
                }
                Attempt::Retry(reason) => {
                    log::warn!("Narrative attempt {}/{} failed: {}", attempt, attempts, reason);
                    last_error = reason;
                    if attempt == attempts {
                        break;
                    }
                    let delay = self.backoff * attempt;
                    if Instant::now() + delay >= deadline {
                        break;
                    }
                    std::thread::sleep(delay);
                }
            }
        }

        if Instant::now() >= deadline || made < attempts {
            return Err(RiskError::NarrativeUnavailable(format!(
                "timed out after {:?} ({} attempt(s)): {}",
                request.timeout, made, last_error
            )));
        }
        Err(RiskError::NarrativeUnavailable(format!(
            "gave up after {} attempt(s): {}",
            made, last_error
        )))
    }

    fn is_available(&self) -> bool {
        self.config.is_configured()
    }
}

fn is_retryable_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

fn first_content(response: CompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
}
