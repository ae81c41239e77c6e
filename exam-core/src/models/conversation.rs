use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Accumulated per-user dialogue data (`class`, `subject`, ...).
pub type ConversationContext = serde_json::Map<String, serde_json::Value>;

/// The four states of the paper-creation dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogueState {
    #[default]
    Idle,
    AskingClass,
    AskingSubject,
    ConfirmingSave,
}

impl DialogueState {
    pub const ALL: [DialogueState; 4] = [
        DialogueState::Idle,
        DialogueState::AskingClass,
        DialogueState::AskingSubject,
        DialogueState::ConfirmingSave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Idle => "IDLE",
            DialogueState::AskingClass => "ASKING_CLASS",
            DialogueState::AskingSubject => "ASKING_SUBJECT",
            DialogueState::ConfirmingSave => "CONFIRMING_SAVE",
        }
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialogue state: {0}")]
pub struct UnknownDialogueState(pub String);

impl FromStr for DialogueState {
    type Err = UnknownDialogueState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DialogueState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownDialogueState(s.to_string()))
    }
}

/// Persisted dialogue position for one user.
///
/// `current_state` is kept as the raw stored label: rows written by older
/// builds (or by hand) may carry labels outside [`DialogueState`], and the
/// engine resets those to `IDLE` instead of failing the load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub user_id: String,
    pub current_state: String,
    pub context: ConversationContext,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_state: DialogueState::Idle.as_str().to_string(),
            context: ConversationContext::new(),
            updated_at: Utc::now(),
        }
    }

    /// Shallow merge: keys in `updates` overwrite, everything else is kept.
    /// An empty map leaves the context untouched.
    pub fn merge_context(&mut self, updates: &ConversationContext) {
        for (key, value) in updates {
            self.context.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_labels_round_trip_through_from_str() {
        for state in DialogueState::ALL {
            assert_eq!(state.as_str().parse::<DialogueState>().unwrap(), state);
        }
        assert!("WAITING".parse::<DialogueState>().is_err());
        assert!("idle".parse::<DialogueState>().is_err(), "labels are case-sensitive");
    }

    #[test]
    fn test_unknown_state_error_message() {
        let err = "WAITING".parse::<DialogueState>().unwrap_err();
        assert_eq!(err, UnknownDialogueState("WAITING".into()));
        assert_eq!(err.to_string(), "unknown dialogue state: WAITING");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn test_serde_uses_screaming_labels() {
        let v = serde_json::to_value(DialogueState::ConfirmingSave).unwrap();
        assert_eq!(v, json!("CONFIRMING_SAVE"));
    }

    #[test]
    fn test_new_state_is_idle_with_empty_context() {
        let state = ConversationState::new("teacher-123");
        assert_eq!(state.current_state, "IDLE");
        assert!(state.context.is_empty());
    }

    #[test]
    fn test_merge_context_overwrites_and_preserves() {
        let mut state = ConversationState::new("u");
        state.context.insert("class".into(), json!("class-7"));
        state.context.insert("subject".into(), json!("Math"));

        let mut updates = ConversationContext::new();
        updates.insert("subject".into(), json!("Science"));
        state.merge_context(&updates);

        assert_eq!(state.context["class"], json!("class-7"));
        assert_eq!(state.context["subject"], json!("Science"));

        state.merge_context(&ConversationContext::new());
        assert_eq!(state.context.len(), 2, "empty update must not clear context");
    }
}
