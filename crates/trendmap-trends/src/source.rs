use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use trendmap_core::{TimelineSeries, TrendTopic};

use crate::error::TrendsError;

/// Supplier of per-region trending topics and per-topic popularity series.
///
/// [`crate::TrendsClient`] talks to Google Trends; tests substitute scripted
/// fakes.
#[async_trait]
pub trait TrendsSource: Send + Sync {
    /// Trending topics for `region` on `date`, in source ranking order.
    async fn fetch_region_trends(
        &self,
        region: &str,
        date: NaiveDate,
    ) -> Result<Vec<TrendTopic>, TrendsError>;

    /// Popularity of `topic` in `region` over the last `lookback_days` days.
    async fn fetch_timeline(
        &self,
        topic: &str,
        region: &str,
        lookback_days: u32,
    ) -> Result<TimelineSeries, TrendsError>;
}

#[async_trait]
impl<T: TrendsSource + ?Sized> TrendsSource for Arc<T> {
    async fn fetch_region_trends(
        &self,
        region: &str,
        date: NaiveDate,
    ) -> Result<Vec<TrendTopic>, TrendsError> {
        (**self).fetch_region_trends(region, date).await
    }

    async fn fetch_timeline(
        &self,
        topic: &str,
        region: &str,
        lookback_days: u32,
    ) -> Result<TimelineSeries, TrendsError> {
        (**self).fetch_timeline(topic, region, lookback_days).await
    }
}
