//! Google Trends access for the trend-snapshot pipeline.
//!
//! [`TrendsSource`] is the contract ingestion and the timeline cache consume;
//! [`TrendsClient`] implements it over the public Trends web endpoints.
//! [`TimelineCache`] memoises per-topic popularity series.

pub mod cache;
pub mod client;
pub mod error;
pub mod parse;
pub mod source;

pub use cache::{TimelineCache, TIMELINE_LOOKBACK_DAYS};
pub use client::TrendsClient;
pub use error::TrendsError;
pub use source::TrendsSource;
