//! Offline tests for trendmap-db pool configuration and the store facade.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::{Duration, Utc};
use trendmap_core::{AppConfig, Environment, NewSnapshot};
use trendmap_db::{PoolConfig, SnapshotStore, StoreError};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: Some("postgres://example".to_string()),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        regions_path: PathBuf::from("./config/regions.yaml"),
        ingest_cron: "0 0 * * * *".to_string(),
        trends_base_url: "https://trends.google.com".to_string(),
        trends_timeout_secs: 15,
        trends_hl: "en-US".to_string(),
        user_agent: "ua".to_string(),
        store_timeout_secs: 10,
        max_concurrent_regions: 4,
        max_topics_per_region: 20,
        max_articles_per_topic: 3,
        retention_days: 7,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn in_memory_store_serves_appended_snapshots() {
    let store = SnapshotStore::in_memory();
    let captured_at = Utc::now() - Duration::hours(13);

    let entry = store
        .append(NewSnapshot {
            captured_at,
            region_trends: vec![],
            global_trends: vec![],
        })
        .await
        .expect("append failed");

    let rows = store
        .query_recent(Utc::now(), 2)
        .await
        .expect("query_recent failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), entry.id());
}

#[tokio::test]
async fn non_monotonic_append_leaves_store_unchanged() {
    let store = SnapshotStore::in_memory();
    let now = Utc::now();
    let snapshot = |captured_at| NewSnapshot {
        captured_at,
        region_trends: vec![],
        global_trends: vec![],
    };

    store.append(snapshot(now)).await.expect("append failed");
    let err: StoreError = store
        .append(snapshot(now))
        .await
        .expect_err("duplicate timestamp should be rejected");
    assert!(err.to_string().contains("not newer"));

    let rows = store
        .query_recent(now + Duration::seconds(1), 10)
        .await
        .expect("query_recent failed");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn open_store_without_database_url_uses_memory() {
    let mut config = app_config();
    config.database_url = None;

    let store = trendmap_db::open_store(&config)
        .await
        .expect("memory store needs no connection");
    store.ping().await.expect("memory store is always reachable");
    assert!(store.oldest().await.expect("oldest").is_none());
}
