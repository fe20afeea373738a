mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use trendmap_pipeline::{IngestConfig, Ingestor};
use trendmap_trends::{TimelineCache, TrendsClient};

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(trendmap_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting trendmap-server");

    let regions = trendmap_core::load_regions(&config.regions_path)?;
    let store = trendmap_db::open_store(&config).await?;
    let client = Arc::new(TrendsClient::from_app_config(&config)?);

    let ingestor = Arc::new(Ingestor::new(
        client.clone(),
        store.clone(),
        IngestConfig::from_app_config(&config, regions.codes()),
    ));
    let _scheduler = scheduler::build_scheduler(ingestor, &config.ingest_cron).await?;

    let timelines = Arc::new(TimelineCache::new(
        client,
        Duration::from_secs(config.trends_timeout_secs),
    ));
    let app = build_app(AppState::new(store, timelines));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
