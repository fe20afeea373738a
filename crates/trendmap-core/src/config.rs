use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
    let env = parse_environment(&or_default("TRENDMAP_ENV", "development"))?;

    let bind_addr = parse_addr("TRENDMAP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("TRENDMAP_LOG_LEVEL", "info");
    let regions_path = PathBuf::from(or_default("TRENDMAP_REGIONS_PATH", "./config/regions.yaml"));
    let ingest_cron = or_default("TRENDMAP_INGEST_CRON", "0 0 */12 * * *");

    let trends_base_url = or_default("TRENDMAP_TRENDS_BASE_URL", "https://trends.google.com/");
    let trends_timeout_secs = parse_u64("TRENDMAP_TRENDS_TIMEOUT_SECS", "30")?;
    let trends_hl = or_default("TRENDMAP_TRENDS_HL", "en-US");
    let user_agent = or_default("TRENDMAP_USER_AGENT", "trendmap/0.1 (trend-snapshots)");

    let store_timeout_secs = parse_u64("TRENDMAP_STORE_TIMEOUT_SECS", "10")?;
    let max_concurrent_regions = parse_positive_usize("TRENDMAP_MAX_CONCURRENT_REGIONS", "4")?;
    let max_topics_per_region = parse_positive_usize("TRENDMAP_MAX_TOPICS_PER_REGION", "20")?;
    let max_articles_per_topic = parse_positive_usize("TRENDMAP_MAX_ARTICLES_PER_TOPIC", "3")?;
    let retention_days = parse_u32("TRENDMAP_RETENTION_DAYS", "7")?;

    let db_max_connections = parse_u32("TRENDMAP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TRENDMAP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TRENDMAP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        regions_path,
        ingest_cron,
        trends_base_url,
        trends_timeout_secs,
        trends_hl,
        user_agent,
        store_timeout_secs,
        max_concurrent_regions,
        max_topics_per_region,
        max_articles_per_topic,
        retention_days,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRENDMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
