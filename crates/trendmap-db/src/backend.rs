//! Persistence backend contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trendmap_core::{NewSnapshot, SnapshotEntry};

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// An ordered, optionally filtered read over stored snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub order: SortOrder,
    /// Only entries captured strictly before this instant qualify.
    pub captured_before: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl SnapshotQuery {
    /// Newest entries first, captured strictly before `before`.
    #[must_use]
    pub fn newest_before(before: DateTime<Utc>, limit: usize) -> Self {
        Self {
            order: SortOrder::Descending,
            captured_before: Some(before),
            limit,
        }
    }

    /// The single globally oldest entry.
    #[must_use]
    pub fn oldest() -> Self {
        Self {
            order: SortOrder::Ascending,
            captured_before: None,
            limit: 1,
        }
    }
}

/// Ordered append-only collection of snapshots.
///
/// Implementations must never expose a partially written entry: `insert`
/// either stores the whole snapshot or nothing.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Persist a new snapshot and return its store-assigned id.
    ///
    /// Rejects a snapshot whose `captured_at` is not strictly later than every
    /// stored entry with [`DbError::NonMonotonicTimestamp`].
    async fn insert(&self, snapshot: &NewSnapshot) -> Result<i64, DbError>;

    /// Read entries ordered by capture time (ties broken by id).
    async fn query_ordered(&self, query: SnapshotQuery) -> Result<Vec<SnapshotEntry>, DbError>;

    /// Delete one entry by id. Returns `false` if no such entry existed.
    async fn delete(&self, id: i64) -> Result<bool, DbError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), DbError>;
}
