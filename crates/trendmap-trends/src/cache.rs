//! Memoised `(topic, region)` timeline lookups.
//!
//! Entries live as long as the cache and are never evicted. Each key owns a
//! once-cell, so concurrent callers for the same key share a single upstream
//! fetch. A failed fetch leaves nothing behind and the next caller retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};
use trendmap_core::TimelineSeries;

use crate::error::TrendsError;
use crate::source::TrendsSource;

/// Days of history requested for every timeline.
pub const TIMELINE_LOOKBACK_DAYS: u32 = 8;

type CacheKey = (String, String);

pub struct TimelineCache {
    source: Arc<dyn TrendsSource>,
    timeout: Duration,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<TimelineSeries>>>>,
}

impl std::fmt::Debug for TimelineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineCache")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TimelineCache {
    #[must_use]
    pub fn new(source: Arc<dyn TrendsSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Popularity series for `topic` in `region`, fetched at most once per key.
    ///
    /// # Errors
    ///
    /// Returns the source's [`TrendsError`], or [`TrendsError::Timeout`] if
    /// the fetch exceeds the cache timeout. Errors are not cached.
    pub async fn get_timeline(
        &self,
        topic: &str,
        region: &str,
    ) -> Result<TimelineSeries, TrendsError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(
                entries
                    .entry((topic.to_owned(), region.to_owned()))
                    .or_default(),
            )
        };

        if let Some(series) = cell.get() {
            tracing::debug!(topic, region, "timeline cache hit");
            return Ok(series.clone());
        }

        let fetched = cell
            .get_or_try_init(|| self.fetch(topic, region))
            .await
            .cloned();
        if fetched.is_err() {
            self.forget_failed(topic, region, cell).await;
        }
        fetched
    }

    /// Drop the key of a failed fetch once no other caller holds its cell.
    ///
    /// Each failing caller releases its handle under the map lock, so the
    /// last one out sees a count of two (map plus its own) and removes it.
    async fn forget_failed(&self, topic: &str, region: &str, cell: Arc<OnceCell<TimelineSeries>>) {
        let mut entries = self.entries.lock().await;
        let key = (topic.to_owned(), region.to_owned());
        let unused = entries.get(&key).is_some_and(|current| {
            Arc::ptr_eq(current, &cell) && !current.initialized() && Arc::strong_count(&cell) == 2
        });
        if unused {
            entries.remove(&key);
        }
        drop(cell);
    }

    /// The cached series for a key, without fetching.
    pub async fn cached(&self, topic: &str, region: &str) -> Option<TimelineSeries> {
        let entries = self.entries.lock().await;
        entries
            .get(&(topic.to_owned(), region.to_owned()))
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of keys holding a fetched series.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn fetch(&self, topic: &str, region: &str) -> Result<TimelineSeries, TrendsError> {
        tracing::info!(topic, region, "timeline cache miss; fetching");
        let fetched = tokio::time::timeout(
            self.timeout,
            self.source
                .fetch_timeline(topic, region, TIMELINE_LOOKBACK_DAYS),
        )
        .await;

        match fetched {
            Ok(Ok(series)) => Ok(series),
            Ok(Err(e)) => {
                tracing::warn!(topic, region, error = %e, "timeline fetch failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(topic, region, timeout = ?self.timeout, "timeline fetch timed out");
                Err(TrendsError::Timeout {
                    timeout: self.timeout,
                })
            }
        }
    }
}
