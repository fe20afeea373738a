//! One ingestion cycle: fetch every region, rank, append, prune.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use trendmap_core::{rank, AppConfig, NewSnapshot, RegionTrends, TrendTopic};
use trendmap_db::{retention_window, SnapshotStore};
use trendmap_trends::{TrendsError, TrendsSource};

use crate::error::IngestError;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Region codes fetched each cycle, in the order they appear in snapshots.
    pub regions: Vec<String>,
    pub max_concurrent_regions: usize,
    pub max_topics_per_region: usize,
    pub max_articles_per_topic: usize,
    /// Upper bound on a single region fetch.
    pub fetch_timeout: Duration,
    /// Entries older than this are pruned, one per cycle.
    pub retention: chrono::Duration,
}

impl IngestConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, regions: Vec<String>) -> Self {
        Self {
            regions,
            max_concurrent_regions: config.max_concurrent_regions,
            max_topics_per_region: config.max_topics_per_region,
            max_articles_per_topic: config.max_articles_per_topic,
            fetch_timeout: Duration::from_secs(config.trends_timeout_secs),
            retention: retention_window(config.retention_days),
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub snapshot_id: i64,
    pub captured_at: DateTime<Utc>,
    pub regions_attempted: usize,
    pub regions_succeeded: Vec<String>,
    pub regions_failed: Vec<String>,
    pub global_trend_count: usize,
    /// Id of the entry removed by retention, if any.
    pub pruned_snapshot_id: Option<i64>,
    /// Set when pruning failed after a successful append.
    pub prune_error: Option<String>,
}

pub struct Ingestor {
    source: Arc<dyn TrendsSource>,
    store: SnapshotStore,
    config: IngestConfig,
}

impl Ingestor {
    #[must_use]
    pub fn new(source: Arc<dyn TrendsSource>, store: SnapshotStore, config: IngestConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run one cycle stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Ingestor::run_cycle_at`].
    pub async fn run_cycle(&self) -> Result<CycleReport, IngestError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle whose snapshot is stamped `now`.
    ///
    /// Regions that fail or time out are skipped. The snapshot is appended
    /// even when every region failed. Pruning runs once after a successful
    /// append; a prune failure is logged and reported, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Append`] if the snapshot cannot be stored. The
    /// store is left unchanged and the next cycle starts from scratch.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, IngestError> {
        let regions = &self.config.regions;
        tracing::info!(regions = regions.len(), captured_at = %now, "ingestion cycle started");

        let date = now.date_naive();
        // Owned codes so the cycle future can be spawned.
        let fetches: Vec<_> = regions
            .iter()
            .cloned()
            .map(|code| async move {
                let outcome = self.fetch_region(&code, date).await;
                (code, outcome)
            })
            .collect();
        let outcomes: Vec<(String, Result<Vec<TrendTopic>, TrendsError>)> = stream::iter(fetches)
            .buffered(self.config.max_concurrent_regions.max(1))
            .collect()
            .await;

        let mut region_trends = Vec::with_capacity(outcomes.len());
        let mut regions_succeeded = Vec::new();
        let mut regions_failed = Vec::new();

        for (code, outcome) in outcomes {
            match outcome {
                Ok(trends) => {
                    regions_succeeded.push(code.clone());
                    region_trends.push(RegionTrends {
                        region: code,
                        trends: self.cap(trends),
                    });
                }
                Err(e) => {
                    tracing::warn!(region = %code, error = %e, "skipping region");
                    regions_failed.push(code);
                }
            }
        }

        if region_trends.is_empty() && !regions.is_empty() {
            tracing::warn!(
                attempted = regions.len(),
                "every region failed; storing an empty snapshot"
            );
        }

        let global_trends = rank(&region_trends);
        let global_trend_count = global_trends.len();

        let entry = self
            .store
            .append(NewSnapshot {
                captured_at: now,
                region_trends,
                global_trends,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "snapshot append failed; aborting cycle");
                IngestError::Append(e)
            })?;

        let (pruned_snapshot_id, prune_error) = match self
            .store
            .prune_oldest_if_stale(now, self.config.retention)
            .await
        {
            Ok(pruned) => (pruned.map(|e| e.id()), None),
            Err(e) => {
                tracing::error!(error = %e, "retention prune failed");
                (None, Some(e.to_string()))
            }
        };

        let report = CycleReport {
            snapshot_id: entry.id(),
            captured_at: entry.captured_at(),
            regions_attempted: regions.len(),
            regions_succeeded,
            regions_failed,
            global_trend_count,
            pruned_snapshot_id,
            prune_error,
        };

        tracing::info!(
            snapshot_id = report.snapshot_id,
            succeeded = report.regions_succeeded.len(),
            failed = report.regions_failed.len(),
            global_trends = report.global_trend_count,
            pruned = ?report.pruned_snapshot_id,
            "ingestion cycle finished"
        );

        Ok(report)
    }

    async fn fetch_region(
        &self,
        code: &str,
        date: NaiveDate,
    ) -> Result<Vec<TrendTopic>, TrendsError> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, self.source.fetch_region_trends(code, date)).await {
            Ok(result) => result,
            Err(_) => Err(TrendsError::Timeout { timeout }),
        }
    }

    fn cap(&self, mut trends: Vec<TrendTopic>) -> Vec<TrendTopic> {
        trends.truncate(self.config.max_topics_per_region);
        for topic in &mut trends {
            topic.articles.truncate(self.config.max_articles_per_topic);
        }
        trends
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use trendmap_core::{Article, GlobalTrend, TimelineSeries};
    use trendmap_db::MemorySnapshotBackend;

    use super::*;

    fn topic(name: &str, articles: usize) -> TrendTopic {
        TrendTopic {
            topic: name.to_string(),
            traffic: "10K+".to_string(),
            explore_link: format!("/trends/explore?q={name}"),
            articles: (0..articles)
                .map(|i| Article {
                    title: format!("{name} story {i}"),
                    url: format!("https://news.example/{name}/{i}"),
                })
                .collect(),
        }
    }

    enum Script {
        Topics(Vec<TrendTopic>),
        Fail,
        Hang,
    }

    /// Answers region fetches from a fixed script.
    struct ScriptedSource {
        script: HashMap<String, Script>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(entries: Vec<(&str, Script)>) -> Self {
            Self {
                script: entries
                    .into_iter()
                    .map(|(code, s)| (code.to_string(), s))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TrendsSource for ScriptedSource {
        async fn fetch_region_trends(
            &self,
            region: &str,
            _date: NaiveDate,
        ) -> Result<Vec<TrendTopic>, TrendsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.get(region) {
                Some(Script::Topics(topics)) => Ok(topics.clone()),
                Some(Script::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(vec![])
                }
                Some(Script::Fail) | None => {
                    Err(TrendsError::Malformed(format!("no data for {region}")))
                }
            }
        }

        async fn fetch_timeline(
            &self,
            _topic: &str,
            _region: &str,
            _lookback_days: u32,
        ) -> Result<TimelineSeries, TrendsError> {
            Ok(vec![])
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 20, 12, 0, 0).unwrap()
    }

    fn config(regions: &[&str]) -> IngestConfig {
        IngestConfig {
            regions: regions.iter().map(ToString::to_string).collect(),
            max_concurrent_regions: 2,
            max_topics_per_region: 20,
            max_articles_per_topic: 3,
            fetch_timeout: Duration::from_secs(5),
            retention: ChronoDuration::days(7),
        }
    }

    fn ingestor(
        source: ScriptedSource,
        config: IngestConfig,
    ) -> (Arc<MemorySnapshotBackend>, SnapshotStore, Ingestor) {
        let backend = Arc::new(MemorySnapshotBackend::new());
        let store = SnapshotStore::new(backend.clone(), Duration::from_secs(5));
        let ingestor = Ingestor::new(Arc::new(source), store.clone(), config);
        (backend, store, ingestor)
    }

    fn standard_source(failing: &str) -> ScriptedSource {
        let mut entries = vec![
            (
                "UA",
                Script::Topics(vec![topic("Trump", 1), topic("Corona", 1)]),
            ),
            (
                "US",
                Script::Topics(vec![topic("Trump", 1), topic("Corona", 1)]),
            ),
            ("GB", Script::Topics(vec![topic("Trump", 1)])),
            ("AR", Script::Topics(vec![topic("Dogs", 1)])),
        ];
        for (code, script) in &mut entries {
            if *code == failing {
                *script = Script::Fail;
            }
        }
        ScriptedSource::new(entries)
    }

    #[tokio::test]
    async fn failing_region_is_skipped_and_ranking_uses_the_rest() {
        let (_, store, ingestor) =
            ingestor(standard_source("AR"), config(&["UA", "US", "GB", "AR"]));

        let report = ingestor.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.regions_attempted, 4);
        assert_eq!(report.regions_succeeded, vec!["UA", "US", "GB"]);
        assert_eq!(report.regions_failed, vec!["AR"]);

        let stored = store.query_recent(now() + ChronoDuration::seconds(1), 1).await.unwrap();
        let entry = &stored[0];
        assert_eq!(entry.captured_at(), now());
        assert_eq!(entry.region_trends().len(), 3);
        assert!(entry.trends_for_region("AR").is_empty());
        assert_eq!(
            entry.global_trends(),
            &[
                GlobalTrend {
                    topic: "Trump".to_string(),
                    count: 3
                },
                GlobalTrend {
                    topic: "Corona".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn all_regions_succeeding_ranks_everything() {
        let (_, store, ingestor) =
            ingestor(standard_source("none"), config(&["UA", "US", "GB", "AR"]));

        let report = ingestor.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.global_trend_count, 3);

        let entry = store.oldest().await.unwrap().unwrap();
        let ranked: Vec<(&str, u32)> = entry
            .global_trends()
            .iter()
            .map(|g| (g.topic.as_str(), g.count))
            .collect();
        assert_eq!(ranked, vec![("Trump", 3), ("Corona", 2), ("Dogs", 1)]);
    }

    #[tokio::test]
    async fn region_order_follows_configuration_not_completion() {
        let source = ScriptedSource::new(vec![
            ("JP", Script::Topics(vec![topic("Sumo", 0)])),
            ("BR", Script::Topics(vec![topic("Futebol", 0)])),
            ("DE", Script::Topics(vec![topic("Bundesliga", 0)])),
        ]);
        let (_, store, ingestor) = ingestor(source, config(&["JP", "BR", "DE"]));

        ingestor.run_cycle_at(now()).await.unwrap();

        let entry = store.oldest().await.unwrap().unwrap();
        let codes: Vec<&str> = entry
            .region_trends()
            .iter()
            .map(|r| r.region.as_str())
            .collect();
        assert_eq!(codes, vec!["JP", "BR", "DE"]);
    }

    #[tokio::test]
    async fn hung_region_times_out_and_is_skipped() {
        let source = ScriptedSource::new(vec![
            ("US", Script::Topics(vec![topic("Trump", 0)])),
            ("FR", Script::Hang),
        ]);
        let mut cfg = config(&["US", "FR"]);
        cfg.fetch_timeout = Duration::from_millis(20);
        let (_, _, ingestor) = ingestor(source, cfg);

        let report = ingestor.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.regions_succeeded, vec!["US"]);
        assert_eq!(report.regions_failed, vec!["FR"]);
    }

    #[tokio::test]
    async fn caps_topics_and_articles() {
        let many: Vec<TrendTopic> = (0..30).map(|i| topic(&format!("t{i}"), 5)).collect();
        let source = ScriptedSource::new(vec![("US", Script::Topics(many))]);
        let mut cfg = config(&["US"]);
        cfg.max_topics_per_region = 20;
        cfg.max_articles_per_topic = 3;
        let (_, store, ingestor) = ingestor(source, cfg);

        ingestor.run_cycle_at(now()).await.unwrap();

        let entry = store.oldest().await.unwrap().unwrap();
        let trends = entry.trends_for_region("US");
        assert_eq!(trends.len(), 20);
        assert!(trends.iter().all(|t| t.articles.len() == 3));
        assert_eq!(entry.global_trends().len(), 10);
    }

    #[tokio::test]
    async fn every_region_failing_still_appends_an_empty_snapshot() {
        let source = ScriptedSource::new(vec![("US", Script::Fail), ("GB", Script::Fail)]);
        let (backend, _, ingestor) = ingestor(source, config(&["US", "GB"]));

        let report = ingestor.run_cycle_at(now()).await.unwrap();
        assert!(report.regions_succeeded.is_empty());
        assert_eq!(report.global_trend_count, 0);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn append_failure_aborts_cycle_without_writing() {
        let (backend, _, ingestor) = ingestor(standard_source("none"), config(&["US"]));
        backend.set_available(false);

        let err = ingestor.run_cycle_at(now()).await.unwrap_err();
        assert!(matches!(err, IngestError::Append(_)));

        backend.set_available(true);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn cycle_prunes_one_stale_entry_after_append() {
        let (backend, store, ingestor) = ingestor(standard_source("none"), config(&["US"]));
        for days in [9, 8] {
            store
                .append(NewSnapshot {
                    captured_at: now() - ChronoDuration::days(days),
                    region_trends: vec![],
                    global_trends: vec![],
                })
                .await
                .unwrap();
        }

        let report = ingestor.run_cycle_at(now()).await.unwrap();
        assert!(report.pruned_snapshot_id.is_some());
        assert!(report.prune_error.is_none());
        assert_eq!(backend.len().await, 2);

        let oldest = store.oldest().await.unwrap().unwrap();
        assert_eq!(oldest.captured_at(), now() - ChronoDuration::days(8));
    }

    #[tokio::test]
    async fn cycle_runs_on_a_spawned_task() {
        let (backend, _, ingestor) = ingestor(standard_source("none"), config(&["US", "GB"]));
        let ingestor = Arc::new(ingestor);

        let handle = tokio::spawn({
            let ingestor = Arc::clone(&ingestor);
            async move { ingestor.run_cycle().await }
        });

        let report = handle.await.expect("task panicked").unwrap();
        assert_eq!(report.regions_succeeded, vec!["US", "GB"]);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn fetches_each_region_once_per_cycle() {
        let source = Arc::new(standard_source("none"));
        let store = SnapshotStore::in_memory();
        let ingestor = Ingestor::new(source.clone(), store, config(&["UA", "US", "GB", "AR"]));

        ingestor.run_cycle_at(now()).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }
}
