//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring ingestion job.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use trendmap_pipeline::{CycleReport, Ingestor};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    ingestor: Arc<Ingestor>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_ingest_job(&scheduler, ingestor, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the snapshot ingestion job. One cycle per trigger.
async fn register_ingest_job(
    scheduler: &JobScheduler,
    ingestor: Arc<Ingestor>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let ingestor = Arc::clone(&ingestor);
        Box::pin(async move {
            run_scheduled_cycle(&ingestor).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered ingestion job");
    Ok(())
}

/// Body of one scheduled trigger. Failures are logged; the next trigger
/// starts a fresh cycle.
async fn run_scheduled_cycle(ingestor: &Ingestor) -> Option<CycleReport> {
    tracing::info!("scheduler: starting ingestion run");
    match ingestor.run_cycle().await {
        Ok(report) => {
            tracing::info!(
                snapshot_id = report.snapshot_id,
                failed_regions = report.regions_failed.len(),
                "scheduler: ingestion run complete"
            );
            Some(report)
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: ingestion run failed");
            None
        }
    }
}
