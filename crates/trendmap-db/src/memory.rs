//! In-process snapshot backend.
//!
//! Used when no `DATABASE_URL` is configured and as the test double for the
//! pipeline and HTTP layers.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use trendmap_core::{NewSnapshot, SnapshotEntry};

use crate::backend::{SnapshotBackend, SnapshotQuery, SortOrder};
use crate::DbError;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    /// Ascending by `captured_at`; insert keeps it that way.
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug)]
pub struct MemorySnapshotBackend {
    state: RwLock<MemoryState>,
    available: AtomicBool,
}

impl Default for MemorySnapshotBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySnapshotBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_id: 1,
                entries: Vec::new(),
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going down (or coming back). While unavailable
    /// every operation fails with [`DbError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DbError::Unavailable(
                "in-memory backend marked unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl SnapshotBackend for MemorySnapshotBackend {
    async fn insert(&self, snapshot: &NewSnapshot) -> Result<i64, DbError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if state
            .entries
            .last()
            .is_some_and(|latest| latest.captured_at() >= snapshot.captured_at)
        {
            return Err(DbError::NonMonotonicTimestamp {
                captured_at: snapshot.captured_at,
            });
        }

        let id = state.next_id;
        state.next_id += 1;
        state.entries.push(SnapshotEntry::new(id, snapshot.clone()));
        Ok(id)
    }

    async fn query_ordered(&self, query: SnapshotQuery) -> Result<Vec<SnapshotEntry>, DbError> {
        self.check_available()?;
        let state = self.state.read().await;

        let qualifies = |entry: &&SnapshotEntry| {
            query
                .captured_before
                .is_none_or(|before| entry.captured_at() < before)
        };

        let rows = match query.order {
            SortOrder::Ascending => state
                .entries
                .iter()
                .filter(qualifies)
                .take(query.limit)
                .cloned()
                .collect(),
            SortOrder::Descending => state
                .entries
                .iter()
                .rev()
                .filter(qualifies)
                .take(query.limit)
                .cloned()
                .collect(),
        };
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|e| e.id() != id);
        Ok(state.entries.len() != before)
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.check_available()
    }
}
