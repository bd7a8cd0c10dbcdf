use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::narrative::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Analysis,
    Question,
    Answer,
    Feature,
    Scenario,
    Recommendation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    pub text: String,
    pub kind: TurnKind,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.text.as_str())
    }
}

/// Append-only conversation log; only `clear` removes turns
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, kind: TurnKind, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
            kind,
            at: Utc::now(),
        });
    }

    /// Last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Last `n` turns as chat history
    pub fn history_messages(&self, n: usize) -> Vec<ChatMessage> {
        self.recent(n).iter().map(Turn::to_message).collect()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_window() {
        let mut conversation = ConversationState::new();
        for i in 0..5 {
            conversation.push(ChatRole::User, TurnKind::Question, format!("q{}", i));
        }

        let recent: Vec<&str> = conversation.recent(2).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(recent, vec!["q3", "q4"]);
        assert_eq!(conversation.recent(50).len(), 5);
        assert!(conversation.recent(0).is_empty());

        let messages = conversation.history_messages(1);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
    }

    #[test]
    fn test_clear() {
        let mut conversation = ConversationState::new();
        conversation.push(ChatRole::Assistant, TurnKind::Analysis, "text");
        assert_eq!(conversation.len(), 1);

        conversation.clear();
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_turn_serialization() {
        let mut conversation = ConversationState::new();
        conversation.push(ChatRole::Assistant, TurnKind::Recommendation, "Pay down balances");

        let json = serde_json::to_value(&conversation.turns()[0]).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["kind"], "recommendation");
    }
}
