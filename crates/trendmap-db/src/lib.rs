//! Snapshot persistence for the trend pipeline.
//!
//! [`SnapshotBackend`] is the append/query/delete contract a document store
//! must satisfy. [`PgSnapshotBackend`] implements it over Postgres and
//! [`MemorySnapshotBackend`] in process. [`SnapshotStore`] wraps either one
//! with per-call timeouts and the retention rule.

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use trendmap_core::AppConfig;

pub mod backend;
pub mod memory;
pub mod postgres;
pub mod store;

pub use backend::{SnapshotBackend, SnapshotQuery, SortOrder};
pub use memory::MemorySnapshotBackend;
pub use postgres::{PgSnapshotBackend, APPEND_LOCK_KEY};
pub use store::{retention_window, SnapshotStore, DEFAULT_RETENTION_DAYS, DEFAULT_STORE_TIMEOUT};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/trendmap-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("snapshot at {captured_at} is not newer than the latest stored snapshot")]
    NonMonotonicTimestamp { captured_at: DateTime<Utc> },
    #[error("store {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

/// The failure kind surfaced by every snapshot store operation.
pub type StoreError = DbError;

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database; treat
    // absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Build the snapshot store the binaries run against.
///
/// With a `database_url` this connects, applies pending migrations and
/// returns a Postgres-backed store. Without one it falls back to an
/// in-memory store whose contents are lost on exit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the pool cannot connect or
/// [`DbError::Migration`] if a migration fails.
pub async fn open_store(config: &AppConfig) -> Result<SnapshotStore, DbError> {
    let timeout = Duration::from_secs(config.store_timeout_secs);

    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; snapshots are kept in memory only");
        return Ok(SnapshotStore::new(
            Arc::new(MemorySnapshotBackend::new()),
            timeout,
        ));
    };

    let pool = connect_pool(database_url, PoolConfig::from_app_config(config)).await?;
    let applied = run_migrations(&pool).await?;
    tracing::info!(applied, "connected to snapshot database");

    Ok(SnapshotStore::new(
        Arc::new(PgSnapshotBackend::new(pool)),
        timeout,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn timeout_error_names_the_operation() {
        let err = DbError::Timeout {
            operation: "append",
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "store append timed out after 10s");
    }
}
