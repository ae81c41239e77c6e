use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Examination board the paper is set for. Only `WB` changes the feedback
/// language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Board {
    #[serde(rename = "WB")]
    Wb,
    #[serde(rename = "CBSE")]
    Cbse,
    #[default]
    Custom,
}

/// One evaluation request, as posted by the evaluation dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringInput {
    pub student_answer: String,
    pub model_answer: String,
    pub total_marks: u32,
    #[serde(default)]
    pub exam_type: String,
    #[serde(default)]
    pub board: Board,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub suggested_marks: u32,
    pub feedback: String,
}

/// A cached scoring result together with the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub hash: String,
    pub prompt: serde_json::Value,
    pub response: ScoringResult,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        now - self.created_at > retention
    }
}
