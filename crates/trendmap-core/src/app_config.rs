use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Postgres URL. When unset the binaries fall back to an in-memory store.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub regions_path: PathBuf,
    pub ingest_cron: String,
    pub trends_base_url: String,
    pub trends_timeout_secs: u64,
    pub trends_hl: String,
    pub user_agent: String,
    pub store_timeout_secs: u64,
    pub max_concurrent_regions: usize,
    pub max_topics_per_region: usize,
    pub max_articles_per_topic: usize,
    pub retention_days: u32,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("regions_path", &self.regions_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("ingest_cron", &self.ingest_cron)
            .field("trends_base_url", &self.trends_base_url)
            .field("trends_timeout_secs", &self.trends_timeout_secs)
            .field("trends_hl", &self.trends_hl)
            .field("user_agent", &self.user_agent)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("max_concurrent_regions", &self.max_concurrent_regions)
            .field("max_topics_per_region", &self.max_topics_per_region)
            .field("max_articles_per_topic", &self.max_articles_per_topic)
            .field("retention_days", &self.retention_days)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
