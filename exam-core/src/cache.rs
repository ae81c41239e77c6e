//! Response cache for evaluation requests
//!
//! Entries are keyed by the SHA-256 of the request's canonical JSON (object
//! keys sorted), so logically equal payloads share one entry regardless of
//! field order. Reads never return an entry older than the retention window;
//! expiry is checked lazily on every `get`, and `purge_expired` is available
//! for a periodic sweep.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::error::ExamError;
use crate::models::{CacheEntry, ScoringResult};

/// Canonical serialization: `serde_json::Map` is a `BTreeMap`, so going
/// through `Value` sorts object keys at every level.
pub fn canonical_json<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(payload)?;
    serde_json::to_string(&value)
}

/// Hex SHA-256 of the canonical form of `payload`.
pub fn compute_key<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a live entry. Expired entries are reported as a miss.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, ExamError>;

    /// Store (or replace) the entry for `key`, stamped with the current time.
    async fn put(
        &self,
        key: &str,
        payload: serde_json::Value,
        result: &ScoringResult,
    ) -> Result<(), ExamError>;

    /// Delete every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, ExamError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// In-memory backend
// ============================================================================

pub struct MemoryResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    retention: chrono::Duration,
}

impl MemoryResponseCache {
    pub fn new(retention: chrono::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Insert a fully-formed entry, keeping its own `created_at`.
    pub async fn insert_entry(&self, entry: CacheEntry) {
        self.entries.write().await.insert(entry.hash.clone(), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now, self.retention))
            .cloned()
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, ExamError> {
        Ok(self.get_at(key, Utc::now()).await)
    }

    async fn put(
        &self,
        key: &str,
        payload: serde_json::Value,
        result: &ScoringResult,
    ) -> Result<(), ExamError> {
        let entry = CacheEntry {
            hash: key.to_string(),
            prompt: payload,
            response: result.clone(),
            created_at: Utc::now(),
        };
        self.insert_entry(entry).await;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, ExamError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.retention));
        Ok((before - entries.len()) as u64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// PostgreSQL backend (`ai_cache` table)
// ============================================================================

pub struct PgResponseCache {
    pool: PgPool,
    retention: chrono::Duration,
}

impl PgResponseCache {
    pub fn new(pool: PgPool, retention: chrono::Duration) -> Self {
        Self { pool, retention }
    }

    /// Oldest `created_at` still served; saturates at the epoch.
    fn cutoff(&self) -> DateTime<Utc> {
        retention_cutoff(Utc::now(), self.retention)
    }
}

fn retention_cutoff(now: DateTime<Utc>, retention: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait]
impl ResponseCache for PgResponseCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, ExamError> {
        let cutoff = self.cutoff();
        let row = sqlx::query_as::<_, (String, serde_json::Value, serde_json::Value, DateTime<Utc>)>(
            r#"
            SELECT hash, prompt, response, created_at
            FROM ai_cache
            WHERE hash = $1 AND created_at >= $2
            "#,
        )
        .bind(key)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((hash, prompt, response, created_at)) => {
                let response: ScoringResult = serde_json::from_value(response)?;
                Ok(Some(CacheEntry {
                    hash,
                    prompt,
                    response,
                    created_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        payload: serde_json::Value,
        result: &ScoringResult,
    ) -> Result<(), ExamError> {
        let response = serde_json::to_value(result)?;
        // Single-statement upsert: readers see the old row or the new one.
        sqlx::query(
            r#"
            INSERT INTO ai_cache (hash, prompt, response, created_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (hash)
            DO UPDATE SET
                prompt = EXCLUDED.prompt,
                response = EXCLUDED.response,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, ExamError> {
        let cutoff = self.cutoff();
        let result = sqlx::query("DELETE FROM ai_cache WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
