//! Append-only log of user intents (`question_added`, `chat_turn`, ...).

use std::collections::VecDeque;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::error::ExamError;
use crate::models::EventRecord;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: &EventRecord) -> Result<(), ExamError>;

    /// Newest-first events for one user.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<EventRecord>, ExamError>;
}

/// Events kept by [`MemoryEventStore`] before the oldest are dropped.
pub const DEFAULT_MEMORY_EVENT_CAPACITY: usize = 10_000;

/// Bounded in-process log; once full, each append evicts the oldest event.
pub struct MemoryEventStore {
    events: RwLock<VecDeque<EventRecord>>,
    capacity: usize,
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_EVENT_CAPACITY)
    }
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: &EventRecord) -> Result<(), ExamError> {
        let mut events = self.events.write().await;
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<EventRecord>, ExamError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: &EventRecord) -> Result<(), ExamError> {
        sqlx::query(
            r#"
            INSERT INTO event_store (id, user_id, intent, params, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id)
        .bind(&event.user_id)
        .bind(&event.intent)
        .bind(&event.params)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<EventRecord>, ExamError> {
        let rows = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, user_id, intent, params, timestamp
            FROM event_store
            WHERE user_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
