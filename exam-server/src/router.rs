use crate::services::AppServices;
use crate::subsystems::{chat, evaluate, events};
use exam_core::protocol::{ExamRequest, ExamResponse};

/// Dispatch one request envelope to its subsystem.
pub async fn handle_request(request: ExamRequest, services: &AppServices) -> ExamResponse {
    match request {
        ExamRequest::Ping => ExamResponse::pong(),
        ExamRequest::Health => {
            match services.bounded(services.states.health_check()).await {
                Ok(backend) => ExamResponse::ok(serde_json::json!({
                    "storage": backend,
                    "cache": services.cache.name(),
                    "status": "healthy"
                })),
                Err(e) => ExamResponse::err(format!("Storage health check failed: {}", e)),
            }
        }
        ExamRequest::Chat { user_id, message } => {
            match chat::handle_chat_turn(services, &user_id, &message).await {
                Ok(reply) => ExamResponse::ok(serde_json::json!({
                    "reply": reply.reply,
                    "state": reply.state,
                })),
                Err(e) => {
                    tracing::error!("Chat turn failed for {}: {}", user_id, e);
                    ExamResponse::err(e.to_string())
                }
            }
        }
        ExamRequest::Evaluate { prompt } => {
            let evaluation = evaluate::evaluate(services, &prompt).await;
            match serde_json::to_value(&evaluation) {
                Ok(data) => ExamResponse::ok(data),
                Err(e) => ExamResponse::err(e.to_string()),
            }
        }
        ExamRequest::LogEvent {
            user_id,
            intent,
            params,
        } => match events::log_event(services, user_id, &intent, params).await {
            Ok(id) => ExamResponse::ok(serde_json::json!({"logged": true, "id": id})),
            Err(e) => {
                tracing::error!("Event logging failed: {}", e);
                ExamResponse::err(e.to_string())
            }
        },
    }
}
