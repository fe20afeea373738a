//! Read-side commands: print what the HTTP API would serve.

use std::sync::Arc;
use std::time::Duration;

use trendmap_core::{AppConfig, GlobalTrend, RegionSelector, TimelineSeries, TrendTopic};
use trendmap_db::{DbError, SnapshotStore};
use trendmap_pipeline::{Retrieved, Retriever};
use trendmap_trends::{TimelineCache, TrendsClient};

/// Open the configured database. Commands that read or prune stored
/// snapshots refuse to fall back to an empty in-memory store.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] when `DATABASE_URL` is unset.
pub(crate) async fn open_persistent_store(config: &AppConfig) -> anyhow::Result<SnapshotStore> {
    if config.database_url.is_none() {
        return Err(DbError::MissingDatabaseUrl.into());
    }
    Ok(trendmap_db::open_store(config).await?)
}

/// Print the global ranking at time range `index`.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset or the store cannot be
/// opened or queried.
pub(crate) async fn run_global(config: &AppConfig, index: u32) -> anyhow::Result<()> {
    let retriever = Retriever::new(open_persistent_store(config).await?);
    let retrieved = retriever.retrieve(&RegionSelector::Global, index).await?;

    match retrieved {
        Retrieved::Global {
            captured_at: Some(captured_at),
            trends,
        } => {
            println!("snapshot captured at {}", captured_at.to_rfc3339());
            print!("{}", format_global(&trends));
        }
        _ => println!("no snapshot available for time range {index}"),
    }
    Ok(())
}

/// Print one region's topics at time range `index`.
///
/// # Errors
///
/// Returns an error if `region` is not a valid code, `DATABASE_URL` is
/// unset, or the store fails.
pub(crate) async fn run_region(config: &AppConfig, region: &str, index: u32) -> anyhow::Result<()> {
    let selector: RegionSelector = region.parse()?;
    if selector == RegionSelector::Global {
        anyhow::bail!("use the `global` command for the global ranking");
    }

    let retriever = Retriever::new(open_persistent_store(config).await?);
    match retriever.retrieve(&selector, index).await? {
        Retrieved::Region {
            region, trends, ..
        } if !trends.is_empty() => {
            print!("{}", format_region(&trends));
            println!("({} topic(s) for {region})", trends.len());
        }
        _ => println!("no trends recorded for {selector} at time range {index}"),
    }
    Ok(())
}

/// Fetch and print a topic's timeline.
///
/// # Errors
///
/// Returns an error if `region` is invalid or the trends source fails.
pub(crate) async fn run_timeline(config: &AppConfig, topic: &str, region: &str) -> anyhow::Result<()> {
    let selector: RegionSelector = region.parse()?;
    let client = Arc::new(TrendsClient::from_app_config(config)?);
    let cache = TimelineCache::new(client, Duration::from_secs(config.trends_timeout_secs));

    let series = cache.get_timeline(topic, &selector.to_string()).await?;
    print!("{}", format_timeline(&series));
    Ok(())
}

pub(crate) fn format_global(trends: &[GlobalTrend]) -> String {
    let mut out = format!("{:<4}{:<40}REGIONS\n", "#", "TOPIC");
    for (i, trend) in trends.iter().enumerate() {
        out.push_str(&format!("{:<4}{:<40}{}\n", i + 1, trend.topic, trend.count));
    }
    out
}

pub(crate) fn format_region(trends: &[TrendTopic]) -> String {
    let mut out = format!("{:<4}{:<40}TRAFFIC\n", "#", "TOPIC");
    for (i, trend) in trends.iter().enumerate() {
        out.push_str(&format!("{:<4}{:<40}{}\n", i + 1, trend.topic, trend.traffic));
        for article in &trend.articles {
            out.push_str(&format!("      - {} <{}>\n", article.title, article.url));
        }
    }
    out
}

/// One line per point with a bar scaled to the 0-100 value.
pub(crate) fn format_timeline(series: &TimelineSeries) -> String {
    series
        .iter()
        .map(|p| {
            let bar = "#".repeat(usize::from(p.value / 5));
            format!("{:<16}{:>4} {bar}\n", p.label, p.value)
        })
        .collect()
}
