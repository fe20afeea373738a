mod ingest;
mod query;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "trendmap-cli")]
#[command(about = "Trend snapshot pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run one ingestion cycle now
    Ingest {
        /// Only fetch these region codes instead of the configured list
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    /// Delete the oldest snapshot if it is past retention
    Prune {
        /// Override the configured retention window, in days
        #[arg(long)]
        max_age_days: Option<u32>,
    },
    /// Show the global ranking at a time range
    Global {
        /// Time-range index, in 12-hour steps back from now
        #[arg(default_value = "0")]
        time_range: u32,
    },
    /// Show one region's trending topics at a time range
    Region {
        /// Region code (e.g., US)
        region: String,
        /// Time-range index, in 12-hour steps back from now
        #[arg(default_value = "0")]
        time_range: u32,
    },
    /// Fetch a topic's popularity over the last eight days
    Timeline {
        topic: String,
        /// Region code, or `global`
        #[arg(default_value = "global")]
        region: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("trendmap-cli: no command given; see --help");
        return Ok(());
    };

    let config = trendmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Migrate => run_migrate(&config).await,
        Commands::Ingest { regions } => ingest::run_ingest(&config, regions).await,
        Commands::Prune { max_age_days } => ingest::run_prune(&config, max_age_days).await,
        Commands::Global { time_range } => query::run_global(&config, time_range).await,
        Commands::Region { region, time_range } => {
            query::run_region(&config, &region, time_range).await
        }
        Commands::Timeline { topic, region } => query::run_timeline(&config, &topic, &region).await,
    }
}

async fn run_migrate(config: &trendmap_core::AppConfig) -> anyhow::Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(trendmap_db::DbError::MissingDatabaseUrl)?;
    let pool =
        trendmap_db::connect_pool(database_url, trendmap_db::PoolConfig::from_app_config(config))
            .await?;
    let applied = trendmap_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}
