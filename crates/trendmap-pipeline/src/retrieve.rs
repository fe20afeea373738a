//! Staleness-aware snapshot retrieval.
//!
//! A snapshot is written at the start of a cycle but its data keeps settling
//! for a while afterwards. Readers asking for time-range index `T` look at the
//! two newest entries older than `T` periods and fall back to the older one
//! when the newer has drifted past the lag threshold.

use chrono::{DateTime, Duration, Utc};
use trendmap_core::{GlobalTrend, RegionSelector, SnapshotEntry, TrendTopic};
use trendmap_db::{SnapshotStore, StoreError};

/// Length of one ingestion cycle; a time-range index is a multiple of it.
pub const SNAPSHOT_PERIOD_HOURS: i64 = 12;

/// Enrichment window after snapshot creation.
pub const PIPELINE_LAG_MINUTES: i64 = 70;

/// Candidates fetched per lookup: the newer and the older entry.
pub const RECENT_QUERY_LIMIT: usize = 2;

fn time_limit(index: u32) -> Duration {
    Duration::hours(SNAPSHOT_PERIOD_HOURS * i64::from(index))
}

/// Choose between the newest (`candidates[0]`) and next-newest
/// (`candidates[1]`) entry for time-range `index` at `now`.
///
/// `candidates` must be ordered newest first.
#[must_use]
pub fn select_entry(
    now: DateTime<Utc>,
    index: u32,
    candidates: &[SnapshotEntry],
) -> Option<&SnapshotEntry> {
    let newer = candidates.first()?;
    let threshold = Duration::minutes(PIPELINE_LAG_MINUTES) + time_limit(index);

    if now - newer.captured_at() > threshold {
        candidates.get(1)
    } else {
        Some(newer)
    }
}

/// Data selected for one lookup. `captured_at` is `None` when nothing
/// qualified, in which case `trends` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieved {
    Global {
        captured_at: Option<DateTime<Utc>>,
        trends: Vec<GlobalTrend>,
    },
    Region {
        region: String,
        captured_at: Option<DateTime<Utc>>,
        trends: Vec<TrendTopic>,
    },
}

impl Retrieved {
    fn from_entry(selector: &RegionSelector, entry: Option<&SnapshotEntry>) -> Self {
        let captured_at = entry.map(SnapshotEntry::captured_at);
        match selector {
            RegionSelector::Global => Self::Global {
                captured_at,
                trends: entry.map(|e| e.global_trends().to_vec()).unwrap_or_default(),
            },
            RegionSelector::Region(code) => Self::Region {
                region: code.clone(),
                captured_at,
                trends: entry
                    .map(|e| e.trends_for_region(code).to_vec())
                    .unwrap_or_default(),
            },
        }
    }

    #[must_use]
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Global { captured_at, .. } | Self::Region { captured_at, .. } => *captured_at,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Global { trends, .. } => trends.is_empty(),
            Self::Region { trends, .. } => trends.is_empty(),
        }
    }
}

/// Read side of the snapshot store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Retriever {
    store: SnapshotStore,
}

impl Retriever {
    #[must_use]
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// See [`Retriever::retrieve_at`].
    pub async fn retrieve(
        &self,
        selector: &RegionSelector,
        index: u32,
    ) -> Result<Retrieved, StoreError> {
        self.retrieve_at(Utc::now(), selector, index).await
    }

    /// Trend data for `selector` at time-range `index`, as seen at `now`.
    ///
    /// No data is an empty result, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only if the store query fails.
    pub async fn retrieve_at(
        &self,
        now: DateTime<Utc>,
        selector: &RegionSelector,
        index: u32,
    ) -> Result<Retrieved, StoreError> {
        // An index reaching past the representable calendar can match nothing.
        let Some(before) = now.checked_sub_signed(time_limit(index)) else {
            return Ok(Retrieved::from_entry(selector, None));
        };

        let candidates = self.store.query_recent(before, RECENT_QUERY_LIMIT).await?;
        let selected = select_entry(now, index, &candidates);

        tracing::debug!(
            %selector,
            index,
            candidates = candidates.len(),
            selected = ?selected.map(SnapshotEntry::id),
            "retrieved snapshot"
        );

        Ok(Retrieved::from_entry(selector, selected))
    }
}
