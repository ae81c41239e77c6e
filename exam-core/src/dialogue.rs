//! Paper-creation dialogue engine
//!
//! Walks a teacher through `IDLE → ASKING_CLASS → ASKING_SUBJECT →
//! CONFIRMING_SAVE → IDLE`. [`transition`] is a pure function of
//! `(state, message, context)`; loading and saving the state is the
//! caller's job.
//!
//! Intent detection is plain lowercase substring matching, kept behind the
//! `is_*` / [`detect_class`] classifier functions so a stricter tokenizer
//! can replace it without touching the state table.

use serde_json::Value;

use crate::models::{ConversationContext, DialogueState};

/// Class numbers in the order they are probed. The order matters: a message
/// containing both "6" and "10" resolves to class 6.
pub const CLASS_CANDIDATES: [&str; 5] = ["6", "7", "8", "9", "10"];

const CREATE_KEYWORDS: [&str; 3] = ["create", "question", "new"];

/// Result of one dialogue turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next_state: DialogueState,
    pub reply: String,
    /// `Some(empty map)` is distinct from `None`: the save confirmation
    /// emits an empty update, which merges as a no-op.
    pub context_updates: Option<ConversationContext>,
}

impl Transition {
    fn to(next_state: DialogueState, reply: impl Into<String>) -> Self {
        Self {
            next_state,
            reply: reply.into(),
            context_updates: None,
        }
    }

    fn with_updates(mut self, updates: ConversationContext) -> Self {
        self.context_updates = Some(updates);
        self
    }
}

// ============================================================================
// Intent classifiers
// ============================================================================

/// True when the message asks to start a new paper.
pub fn is_create_intent(message: &str) -> bool {
    let msg = message.to_lowercase();
    CREATE_KEYWORDS.iter().any(|k| msg.contains(k))
}

/// First class number found in the message, as `class-<n>`.
pub fn detect_class(message: &str) -> Option<String> {
    CLASS_CANDIDATES
        .iter()
        .find(|n| message.contains(*n))
        .map(|n| format!("class-{}", n))
}

/// Anything longer than two characters is accepted as a subject name.
pub fn is_valid_subject(message: &str) -> bool {
    message.chars().count() > 2
}

pub fn is_affirmative(message: &str) -> bool {
    message.to_lowercase().contains("yes")
}

// ============================================================================
// State machine
// ============================================================================

/// Compute the next dialogue step. Never fails: unknown state labels reset
/// to `IDLE` and unmatched messages re-prompt.
pub fn transition(current_state: &str, message: &str, context: &ConversationContext) -> Transition {
    let state = match current_state.parse::<DialogueState>() {
        Ok(state) => state,
        Err(e) => {
            tracing::debug!("{}; resetting conversation", e);
            return Transition::to(DialogueState::Idle, "Resetting conversation.");
        }
    };

    match state {
        DialogueState::Idle => {
            if is_create_intent(message) {
                Transition::to(
                    DialogueState::AskingClass,
                    "Sure! Which class is this for? (e.g., Class 6, Class 10)",
                )
            } else {
                Transition::to(
                    DialogueState::Idle,
                    "I can help you create a question paper. Type \"create question\" to start.",
                )
            }
        }
        DialogueState::AskingClass => match detect_class(message) {
            Some(class) => {
                let reply = format!(
                    "Got it ({}). Which subject? (Math, Science, Bengali...)",
                    class
                );
                let mut updates = ConversationContext::new();
                updates.insert("class".to_string(), Value::String(class));
                Transition::to(DialogueState::AskingSubject, reply).with_updates(updates)
            }
            None => Transition::to(DialogueState::AskingClass, "Please specify the class (6-10)."),
        },
        DialogueState::AskingSubject => {
            if is_valid_subject(message) {
                let class = context
                    .get("class")
                    .and_then(Value::as_str)
                    .unwrap_or("Class");
                let reply = format!(
                    "Okay, creating a {} {} paper. Should I save this draft? (yes/no)",
                    class, message
                );
                let mut updates = ConversationContext::new();
                updates.insert("subject".to_string(), Value::String(message.to_string()));
                Transition::to(DialogueState::ConfirmingSave, reply).with_updates(updates)
            } else {
                Transition::to(DialogueState::AskingSubject, "Please enter a valid subject name.")
            }
        }
        DialogueState::ConfirmingSave => {
            if is_affirmative(message) {
                // No paper is persisted here; the reply is a confirmation only.
                Transition::to(DialogueState::Idle, "Draft saved successfully! (Mock Action)")
                    .with_updates(ConversationContext::new())
            } else {
                Transition::to(DialogueState::Idle, "Cancelled. You can start over.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, &str)]) -> ConversationContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_state_table() {
        let empty = ConversationContext::new();
        let cases: &[(&str, &str, DialogueState)] = &[
            ("IDLE", "I want to CREATE a paper", DialogueState::AskingClass),
            ("IDLE", "new one", DialogueState::AskingClass),
            ("IDLE", "add a Question", DialogueState::AskingClass),
            ("IDLE", "hello", DialogueState::Idle),
            ("ASKING_CLASS", "class 8", DialogueState::AskingSubject),
            ("ASKING_CLASS", "eighth", DialogueState::AskingClass),
            ("ASKING_SUBJECT", "Math", DialogueState::ConfirmingSave),
            ("ASKING_SUBJECT", "ab", DialogueState::AskingSubject),
            ("CONFIRMING_SAVE", "YES please", DialogueState::Idle),
            ("CONFIRMING_SAVE", "no", DialogueState::Idle),
            ("SOMETHING_ELSE", "create", DialogueState::Idle),
            ("", "", DialogueState::Idle),
        ];

        for (state, message, expected) in cases {
            let t = transition(state, message, &empty);
            assert_eq!(
                t.next_state, *expected,
                "({}, {:?}) should move to {}",
                state, message, expected
            );
        }
    }

    #[test]
    fn test_idle_help_reply() {
        let t = transition("IDLE", "hi there", &ConversationContext::new());
        assert!(t.reply.contains("create question"));
        assert!(t.context_updates.is_none());
    }

    #[test]
    fn test_unknown_state_resets() {
        let t = transition("ASKING_GRADE", "10", &ctx(&[("class", "class-9")]));
        assert_eq!(t.next_state, DialogueState::Idle);
        assert_eq!(t.reply, "Resetting conversation.");
        assert!(t.context_updates.is_none());
    }

    #[test]
    fn test_class_detection_order() {
        assert_eq!(detect_class("class 10 please").as_deref(), Some("class-10"));
        assert_eq!(detect_class("Class 7").as_deref(), Some("class-7"));
        // "6" is probed before "10"
        assert_eq!(detect_class("class 16").as_deref(), Some("class-6"));
        assert_eq!(detect_class("between 10 and 9").as_deref(), Some("class-9"));
        // "1" and "0" apart are not "10"
        assert_eq!(detect_class("1 and 0"), None);
        assert_eq!(detect_class("class 5"), None);
        // substring matching, not tokenized
        assert_eq!(detect_class("way9ward").as_deref(), Some("class-9"));
    }

    #[test]
    fn test_asking_class_sets_context() {
        let t = transition("ASKING_CLASS", "class 10 please", &ConversationContext::new());
        assert_eq!(t.next_state, DialogueState::AskingSubject);
        assert_eq!(t.context_updates, Some(ctx(&[("class", "class-10")])));
        assert!(t.reply.contains("class-10"));
    }

    #[test]
    fn test_asking_class_reprompt_on_split_digits() {
        let t = transition("ASKING_CLASS", "1 and 0", &ConversationContext::new());
        assert_eq!(t.next_state, DialogueState::AskingClass);
        assert_eq!(t.reply, "Please specify the class (6-10).");
        assert!(t.context_updates.is_none());
    }

    #[test]
    fn test_subject_keeps_raw_message_and_echoes_class() {
        let t = transition("ASKING_SUBJECT", "Science", &ctx(&[("class", "class-9")]));
        assert_eq!(t.next_state, DialogueState::ConfirmingSave);
        assert_eq!(t.context_updates, Some(ctx(&[("subject", "Science")])));
        assert!(t.reply.contains("class-9 Science"));
    }

    #[test]
    fn test_subject_without_class_uses_placeholder() {
        let t = transition("ASKING_SUBJECT", "History", &ConversationContext::new());
        assert!(t.reply.contains("Class History"));
    }

    #[test]
    fn test_subject_length_counts_characters() {
        // five code points, well over the two-character floor
        let t = transition("ASKING_SUBJECT", "বাংলা", &ConversationContext::new());
        assert_eq!(t.next_state, DialogueState::ConfirmingSave);
        let t = transition("ASKING_SUBJECT", "গণ", &ConversationContext::new());
        assert_eq!(t.next_state, DialogueState::AskingSubject);
    }

    #[test]
    fn test_confirm_yes_emits_empty_update() {
        let t = transition(
            "CONFIRMING_SAVE",
            "yes",
            &ctx(&[("class", "class-9"), ("subject", "Science")]),
        );
        assert_eq!(t.next_state, DialogueState::Idle);
        assert!(t.reply.contains("Draft saved"));
        assert_eq!(t.context_updates, Some(ConversationContext::new()));
    }

    #[test]
    fn test_confirm_other_cancels() {
        let t = transition("CONFIRMING_SAVE", "nope", &ConversationContext::new());
        assert_eq!(t.next_state, DialogueState::Idle);
        assert!(t.reply.starts_with("Cancelled"));
        assert!(t.context_updates.is_none());
    }

    #[test]
    fn test_transition_is_total_and_deterministic() {
        let labels = ["IDLE", "ASKING_CLASS", "ASKING_SUBJECT", "CONFIRMING_SAVE", "idle", "??"];
        let messages = ["", " ", "x", "yes", "create", "class 6", "10", "Geography", "ন"];
        let context = ctx(&[("class", "class-6")]);

        for label in labels {
            for message in messages {
                let first = transition(label, message, &context);
                let second = transition(label, message, &context);
                assert_eq!(first, second);
                assert!(DialogueState::ALL.contains(&first.next_state));
                assert!(!first.reply.is_empty(), "every turn must produce a reply");
            }
        }
    }
}
