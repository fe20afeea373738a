//! Database operations for the `trend_snapshots` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use trendmap_core::{GlobalTrend, NewSnapshot, RegionTrends, SnapshotEntry};

use crate::backend::{SnapshotBackend, SnapshotQuery, SortOrder};
use crate::DbError;

/// Transaction-scoped advisory lock held by every snapshot insert.
pub const APPEND_LOCK_KEY: i64 = 0x7472_656e_646d_6170;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `trend_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SnapshotRow {
    id: i64,
    captured_at: DateTime<Utc>,
    region_trends: Json<Vec<RegionTrends>>,
    global_trends: Json<Vec<GlobalTrend>>,
}

impl From<SnapshotRow> for SnapshotEntry {
    fn from(row: SnapshotRow) -> Self {
        SnapshotEntry::new(
            row.id,
            NewSnapshot {
                captured_at: row.captured_at,
                region_trends: row.region_trends.0,
                global_trends: row.global_trends.0,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgSnapshotBackend {
    pool: PgPool,
}

impl PgSnapshotBackend {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotBackend for PgSnapshotBackend {
    /// Insert a snapshot only if it is newer than every stored row.
    ///
    /// Writers serialize on [`APPEND_LOCK_KEY`] for the length of the
    /// transaction, so the guard always sees every previously committed row.
    /// A rejected snapshot leaves no trace.
    async fn insert(&self, snapshot: &NewSnapshot) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO trend_snapshots (captured_at, region_trends, global_trends) \
             SELECT $1::timestamptz, $2::jsonb, $3::jsonb \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM trend_snapshots WHERE captured_at >= $1 \
             ) \
             RETURNING id",
        )
        .bind(snapshot.captured_at)
        .bind(Json(&snapshot.region_trends))
        .bind(Json(&snapshot.global_trends))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            tx.rollback().await?;
            return Err(DbError::NonMonotonicTimestamp {
                captured_at: snapshot.captured_at,
            });
        };

        tx.commit().await?;
        Ok(id)
    }

    async fn query_ordered(&self, query: SnapshotQuery) -> Result<Vec<SnapshotEntry>, DbError> {
        let direction = match query.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let sql = format!(
            "SELECT id, captured_at, region_trends, global_trends \
             FROM trend_snapshots \
             WHERE ($1::timestamptz IS NULL OR captured_at < $1) \
             ORDER BY captured_at {direction}, id {direction} \
             LIMIT $2"
        );
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(query.captured_before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(SnapshotEntry::from).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM trend_snapshots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query_scalar::<_, i64>("SELECT 1::BIGINT")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
