use anyhow::Result;
use exam_core::models::EventRecord;
use uuid::Uuid;

use crate::services::AppServices;

/// Append one intent event. A missing or blank user id is logged as
/// `anonymous`.
pub async fn log_event(
    services: &AppServices,
    user_id: Option<String>,
    intent: &str,
    params: serde_json::Value,
) -> Result<Uuid> {
    let event = EventRecord::new(user_id, intent, params);
    services.bounded(services.events.append(&event)).await?;
    tracing::debug!("Logged event {} ({}) for {}", event.id, event.intent, event.user_id);
    Ok(event.id)
}
