use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ANONYMOUS_USER: &str = "anonymous";

/// A user-intent record, e.g. `question_added` or `chat_turn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: Uuid,
    pub user_id: String,
    pub intent: String,
    pub params: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(user_id: Option<String>, intent: impl Into<String>, params: serde_json::Value) -> Self {
        let user_id = user_id
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());
        let params = if params.is_null() {
            serde_json::json!({})
        } else {
            params
        };
        Self {
            id: Uuid::new_v4(),
            user_id,
            intent: intent.into(),
            params,
            timestamp: Utc::now(),
        }
    }
}
