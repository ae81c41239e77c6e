//! Per-user conversation state persistence
//!
//! `load` creates the default `IDLE` row on first contact; `save` overwrites
//! the state label and shallow-merges context updates (keys are never
//! removed, so an empty update keeps the existing context).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::error::ExamError;
use crate::models::{ConversationContext, ConversationState, DialogueState};

#[async_trait]
pub trait ConversationStateStore: Send + Sync {
    /// Fetch the user's state, creating the default one if the user is new.
    async fn load(&self, user_id: &str) -> Result<ConversationState, ExamError>;

    /// Persist the next state and merge `context_updates` into the stored
    /// context. Returns the state as stored.
    async fn save(
        &self,
        user_id: &str,
        next_state: DialogueState,
        context_updates: Option<&ConversationContext>,
    ) -> Result<ConversationState, ExamError>;

    /// Short description of the backing store, used by `/health`.
    async fn health_check(&self) -> Result<String, ExamError>;
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's raw state, bypassing the merge rules.
    pub async fn insert_raw(&self, state: ConversationState) {
        self.states
            .write()
            .await
            .insert(state.user_id.clone(), state);
    }

    pub async fn user_count(&self) -> usize {
        self.states.read().await.len()
    }
}

#[async_trait]
impl ConversationStateStore for MemoryStateStore {
    async fn load(&self, user_id: &str) -> Result<ConversationState, ExamError> {
        if let Some(state) = self.states.read().await.get(user_id) {
            return Ok(state.clone());
        }

        let mut states = self.states.write().await;
        let state = states
            .entry(user_id.to_string())
            .or_insert_with(|| ConversationState::new(user_id));
        Ok(state.clone())
    }

    async fn save(
        &self,
        user_id: &str,
        next_state: DialogueState,
        context_updates: Option<&ConversationContext>,
    ) -> Result<ConversationState, ExamError> {
        let mut states = self.states.write().await;
        let state = states
            .entry(user_id.to_string())
            .or_insert_with(|| ConversationState::new(user_id));

        state.current_state = next_state.as_str().to_string();
        if let Some(updates) = context_updates {
            state.merge_context(updates);
        }
        state.updated_at = Utc::now();
        Ok(state.clone())
    }

    async fn health_check(&self) -> Result<String, ExamError> {
        Ok("memory".to_string())
    }
}

// ============================================================================
// PostgreSQL backend (`conversation_states` table)
// ============================================================================

type StateRow = (String, String, serde_json::Value, DateTime<Utc>);

fn state_from_row((user_id, current_state, context, updated_at): StateRow) -> ConversationState {
    let context = match context {
        serde_json::Value::Object(map) => map,
        other => {
            tracing::warn!(
                "Non-object context stored for user {} ({}); treating as empty",
                user_id,
                other
            );
            ConversationContext::new()
        }
    };
    ConversationState {
        user_id,
        current_state,
        context,
        updated_at,
    }
}

pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStateStore for PgStateStore {
    async fn load(&self, user_id: &str) -> Result<ConversationState, ExamError> {
        // Lazy creation; existing rows are left untouched
        sqlx::query(
            r#"
            INSERT INTO conversation_states (user_id, current_state, context, updated_at)
            VALUES ($1, $2, '{}'::jsonb, now())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(DialogueState::Idle.as_str())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, StateRow>(
            r#"
            SELECT user_id, current_state, context, updated_at
            FROM conversation_states
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(state_from_row(row))
    }

    async fn save(
        &self,
        user_id: &str,
        next_state: DialogueState,
        context_updates: Option<&ConversationContext>,
    ) -> Result<ConversationState, ExamError> {
        let updates = serde_json::Value::Object(context_updates.cloned().unwrap_or_default());

        // jsonb `||` is a shallow merge: right-hand keys win, others stay
        let row = sqlx::query_as::<_, StateRow>(
            r#"
            INSERT INTO conversation_states (user_id, current_state, context, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id)
            DO UPDATE SET
                current_state = EXCLUDED.current_state,
                context = conversation_states.context || EXCLUDED.context,
                updated_at = now()
            RETURNING user_id, current_state, context, updated_at
            "#,
        )
        .bind(user_id)
        .bind(next_state.as_str())
        .bind(updates)
        .fetch_one(&self.pool)
        .await?;

        Ok(state_from_row(row))
    }

    async fn health_check(&self) -> Result<String, ExamError> {
        Ok(crate::db::health_check(&self.pool).await?)
    }
}
