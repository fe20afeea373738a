//! Write-side commands: run a cycle, prune retention.

use std::sync::Arc;

use trendmap_core::{AppConfig, RegionSelector};
use trendmap_db::retention_window;
use trendmap_pipeline::{CycleReport, IngestConfig, Ingestor};
use trendmap_trends::TrendsClient;

/// Run one ingestion cycle and print its report.
///
/// `only_regions` replaces the configured region list when non-empty.
///
/// # Errors
///
/// Returns an error if configuration or the regions file is invalid, the
/// store cannot be opened, or the snapshot append fails. Region fetch
/// failures are reported, not returned.
pub(crate) async fn run_ingest(config: &AppConfig, only_regions: Vec<String>) -> anyhow::Result<()> {
    let regions = if only_regions.is_empty() {
        trendmap_core::load_regions(&config.regions_path)?.codes()
    } else {
        normalise_regions(only_regions)?
    };

    tracing::info!(regions = regions.len(), "running one ingestion cycle");

    let store = trendmap_db::open_store(config).await?;
    let client = Arc::new(TrendsClient::from_app_config(config)?);
    let ingestor = Ingestor::new(
        client,
        store,
        IngestConfig::from_app_config(config, regions),
    );

    let report = ingestor.run_cycle().await?;
    print!("{}", format_report(&report));
    Ok(())
}

/// Run one retention pass.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset, the store cannot be opened,
/// or the prune fails.
pub(crate) async fn run_prune(config: &AppConfig, max_age_days: Option<u32>) -> anyhow::Result<()> {
    let store = crate::query::open_persistent_store(config).await?;
    let days = max_age_days.unwrap_or(config.retention_days);

    match store
        .prune_oldest_if_stale(chrono::Utc::now(), retention_window(days))
        .await?
    {
        Some(entry) => println!(
            "pruned snapshot {} captured at {}",
            entry.id(),
            entry.captured_at().to_rfc3339()
        ),
        None => println!("nothing older than {days} day(s) to prune"),
    }
    Ok(())
}

fn normalise_regions(raw: Vec<String>) -> anyhow::Result<Vec<String>> {
    raw.into_iter()
        .map(|code| match code.parse::<RegionSelector>()? {
            RegionSelector::Region(code) => Ok(code),
            RegionSelector::Global => anyhow::bail!("'global' is not an ingestible region"),
        })
        .collect()
}

pub(crate) fn format_report(report: &CycleReport) -> String {
    let mut out = format!(
        "snapshot {} captured at {}\n  regions: {} attempted, {} succeeded, {} failed\n  global trends: {}\n",
        report.snapshot_id,
        report.captured_at.to_rfc3339(),
        report.regions_attempted,
        report.regions_succeeded.len(),
        report.regions_failed.len(),
        report.global_trend_count,
    );
    if !report.regions_failed.is_empty() {
        out.push_str(&format!("  failed: {}\n", report.regions_failed.join(", ")));
    }
    match (&report.pruned_snapshot_id, &report.prune_error) {
        (Some(id), _) => out.push_str(&format!("  pruned snapshot {id}\n")),
        (None, Some(e)) => out.push_str(&format!("  prune failed: {e}\n")),
        (None, None) => {}
    }
    out
}
