//! Chat turn: load state → dialogue transition → save state → reply.

use anyhow::Result;
use exam_core::dialogue;
use exam_core::models::EventRecord;
use serde::Serialize;

use crate::services::AppServices;

/// Reply shown when the conversation store fails mid-turn.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub state: String,
}

/// Run one dialogue turn for `user_id`. Turns for the same user are
/// serialized; store failures are returned to the caller untouched.
pub async fn handle_chat_turn(
    services: &AppServices,
    user_id: &str,
    message: &str,
) -> Result<ChatReply> {
    let _guard = services.locks.acquire(user_id).await;

    let current = services.bounded(services.states.load(user_id)).await?;
    let step = dialogue::transition(&current.current_state, message, &current.context);

    let saved = services
        .bounded(services.states.save(
            user_id,
            step.next_state,
            step.context_updates.as_ref(),
        ))
        .await?;

    tracing::debug!(
        "Chat turn for {}: {} -> {}",
        user_id,
        current.current_state,
        saved.current_state
    );

    let event = EventRecord::new(
        Some(user_id.to_string()),
        "chat_turn",
        serde_json::json!({
            "from": current.current_state,
            "to": saved.current_state,
        }),
    );
    if let Err(e) = services.bounded(services.events.append(&event)).await {
        tracing::warn!("Failed to record chat_turn event (non-fatal): {}", e);
    }

    Ok(ChatReply {
        reply: step.reply,
        state: saved.current_state,
    })
}
