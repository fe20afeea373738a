//! Core domain types and pure logic for the trend-snapshot pipeline.
//!
//! Holds the snapshot data model, the global ranking engine, and the
//! environment/YAML configuration shared by the server and CLI binaries.

pub mod app_config;
pub mod config;
pub mod error;
pub mod ranking;
pub mod regions;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use ranking::{rank, GLOBAL_TREND_LIMIT};
pub use regions::{load_regions, parse_regions, RegionConfig, RegionsFile};
pub use types::{
    Article, GlobalTrend, NewSnapshot, RegionSelector, RegionTrends, SnapshotEntry, TimelinePoint,
    TimelineSeries, TrendTopic,
};
