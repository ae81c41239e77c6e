//! Wiring of the stores behind the chat and evaluation endpoints.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use exam_core::config::StorageBackend;
use exam_core::{
    ConversationStateStore, EventStore, ExamConfig, ExamError, MemoryEventStore,
    MemoryResponseCache, MemoryStateStore, PgEventStore, PgResponseCache, PgStateStore,
    ResponseCache,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user id, so turns from the same user run one at a
/// time across load → transition → save.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop lock entries nobody is holding or waiting on.
    pub async fn prune(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}

/// Everything a request handler needs, shared behind an `Arc`.
pub struct AppServices {
    pub states: Arc<dyn ConversationStateStore>,
    pub cache: Arc<dyn ResponseCache>,
    pub events: Arc<dyn EventStore>,
    pub locks: UserLocks,
    pub storage_timeout: Duration,
}

impl AppServices {
    pub fn new(
        states: Arc<dyn ConversationStateStore>,
        cache: Arc<dyn ResponseCache>,
        events: Arc<dyn EventStore>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            states,
            cache,
            events,
            locks: UserLocks::new(),
            storage_timeout,
        }
    }

    /// Memory-backed services with the configured retention.
    pub fn in_memory(config: &ExamConfig) -> Self {
        Self::new(
            Arc::new(MemoryStateStore::new()),
            Arc::new(MemoryResponseCache::new(config.cache.retention())),
            Arc::new(MemoryEventStore::new()),
            Duration::from_millis(config.storage.timeout_ms),
        )
    }

    /// Build the services for the configured backend. The Postgres backend
    /// connects, creates missing tables, and fails if the database is
    /// unreachable.
    pub async fn from_config(config: &ExamConfig) -> anyhow::Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage backend");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Postgres => {
                let db_config = config
                    .database
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("postgres backend requires [database] config"))?;
                let pool = exam_core::db::create_pool(db_config).await?;
                exam_core::db::ensure_schema(&pool).await?;
                tracing::info!("Using PostgreSQL storage backend");
                Ok(Self::new(
                    Arc::new(PgStateStore::new(pool.clone())),
                    Arc::new(PgResponseCache::new(pool.clone(), config.cache.retention())),
                    Arc::new(PgEventStore::new(pool)),
                    Duration::from_millis(config.storage.timeout_ms),
                ))
            }
        }
    }

    /// Run a store call under the storage timeout.
    pub async fn bounded<T, F>(&self, fut: F) -> Result<T, ExamError>
    where
        F: Future<Output = Result<T, ExamError>>,
    {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ExamError::Timeout(self.storage_timeout.as_millis() as u64)),
        }
    }
}
