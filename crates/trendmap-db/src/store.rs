//! Snapshot store: timeout-bounded access to a backend plus retention.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use trendmap_core::{NewSnapshot, SnapshotEntry};

use crate::backend::{SnapshotBackend, SnapshotQuery};
use crate::memory::MemorySnapshotBackend;
use crate::DbError;

/// Entries older than this many days are eligible for pruning.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Upper bound on any single backend call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Append-only, timestamp-ordered snapshot storage.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn SnapshotBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    #[must_use]
    pub fn new(backend: Arc<dyn SnapshotBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// A store over a fresh [`MemorySnapshotBackend`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemorySnapshotBackend::new()),
            DEFAULT_STORE_TIMEOUT,
        )
    }

    /// Persist a new immutable snapshot and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write, is unreachable,
    /// or does not answer within the store timeout. Nothing is persisted on
    /// error.
    ///
    /// A timed-out insert may still have committed. Before reporting the
    /// timeout the store looks for a row at `captured_at` and returns it if
    /// found.
    pub async fn append(&self, snapshot: NewSnapshot) -> Result<SnapshotEntry, DbError> {
        match self
            .bounded("append", self.backend.insert(&snapshot))
            .await
        {
            Ok(id) => Ok(SnapshotEntry::new(id, snapshot)),
            Err(err @ DbError::Timeout { .. }) => self.recover_timed_out_append(&snapshot, err).await,
            Err(err) => Err(err),
        }
    }

    async fn recover_timed_out_append(
        &self,
        snapshot: &NewSnapshot,
        err: DbError,
    ) -> Result<SnapshotEntry, DbError> {
        let before = snapshot.captured_at + chrono::Duration::milliseconds(1);
        let committed = match self.query_recent(before, 1).await {
            Ok(rows) => rows.into_iter().next().filter(|entry| {
                // Backends may store coarser than nanosecond precision.
                (entry.captured_at() - snapshot.captured_at).num_microseconds() == Some(0)
            }),
            Err(recheck) => {
                tracing::warn!(error = %recheck, "could not confirm timed-out append");
                None
            }
        };

        match committed {
            Some(entry) => {
                tracing::warn!(
                    snapshot_id = entry.id(),
                    "append timed out after the snapshot was committed"
                );
                Ok(entry)
            }
            None => Err(err),
        }
    }

    /// Up to `limit` most recent entries captured strictly before `before`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails or times out.
    pub async fn query_recent(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SnapshotEntry>, DbError> {
        self.bounded(
            "query_recent",
            self.backend
                .query_ordered(SnapshotQuery::newest_before(before, limit)),
        )
        .await
    }

    /// The globally oldest stored entry, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails or times out.
    pub async fn oldest(&self) -> Result<Option<SnapshotEntry>, DbError> {
        let mut rows = self
            .bounded("oldest", self.backend.query_ordered(SnapshotQuery::oldest()))
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Delete the single oldest entry if it is older than `max_age` at `now`.
    ///
    /// Deletes at most one entry per call; a backlog of stale entries drains
    /// one call at a time. Returns the deleted entry, or `None` when nothing
    /// was stale.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails or times out.
    pub async fn prune_oldest_if_stale(
        &self,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Result<Option<SnapshotEntry>, DbError> {
        let Some(oldest) = self.oldest().await? else {
            return Ok(None);
        };

        if now - oldest.captured_at() <= max_age {
            return Ok(None);
        }

        let deleted = self
            .bounded("prune", self.backend.delete(oldest.id()))
            .await?;
        if deleted {
            tracing::info!(
                snapshot_id = oldest.id(),
                captured_at = %oldest.captured_at(),
                "pruned stale snapshot"
            );
            Ok(Some(oldest))
        } else {
            // Someone else removed it between the read and the delete.
            Ok(None)
        }
    }

    /// Verify the backend answers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails or times out.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.bounded("ping", self.backend.ping()).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }
}

/// Retention window as a chrono duration.
#[must_use]
pub fn retention_window(days: u32) -> chrono::Duration {
    chrono::Duration::days(i64::from(days))
}
