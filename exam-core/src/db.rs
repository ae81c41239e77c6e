use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS conversation_states (
        user_id TEXT PRIMARY KEY,
        current_state TEXT NOT NULL DEFAULT 'IDLE',
        context JSONB NOT NULL DEFAULT '{}'::jsonb,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ai_cache (
        hash TEXT PRIMARY KEY,
        prompt JSONB NOT NULL,
        response JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ai_cache_created_at_idx ON ai_cache (created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS event_store (
        id UUID PRIMARY KEY,
        user_id TEXT NOT NULL DEFAULT 'anonymous',
        intent TEXT NOT NULL,
        params JSONB NOT NULL DEFAULT '{}'::jsonb,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS event_store_user_ts_idx ON event_store (user_id, timestamp DESC)",
];

/// Create the tables backing the conversation, cache and event stores.
/// Safe to run on every start-up.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Database schema verified ({} statements)", SCHEMA.len());
    Ok(())
}
