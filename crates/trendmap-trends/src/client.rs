//! HTTP client for the Google Trends web endpoints.
//!
//! Wraps `reqwest` with base-URL handling, per-request timeouts and the
//! payload parsers in [`crate::parse`]. Use [`TrendsClient::new`] for the
//! production host or [`TrendsClient::with_base_url`] to point at a mock
//! server in tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use reqwest::{Client, Url};
use trendmap_core::{AppConfig, TimelineSeries, TrendTopic};

use crate::error::TrendsError;
use crate::parse::{parse_daily_trends, parse_timeline, parse_timeseries_widget};
use crate::source::TrendsSource;

const DEFAULT_BASE_URL: &str = "https://trends.google.com/";
const DAILY_TRENDS_PATH: &str = "trends/api/dailytrends";
const EXPLORE_PATH: &str = "trends/api/explore";
const MULTILINE_PATH: &str = "trends/api/widgetdata/multiline";

/// Number of daily trending searches the upstream returns per page.
const DAILY_TRENDS_PAGE_SIZE: &str = "15";

/// Client for the Google Trends daily-trends and interest-over-time APIs.
#[derive(Debug, Clone)]
pub struct TrendsClient {
    client: Client,
    base_url: Url,
    hl: String,
    timeout: Duration,
}

impl TrendsClient {
    /// Creates a client pointed at the production Google Trends host.
    ///
    /// # Errors
    ///
    /// Returns [`TrendsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str, hl: &str) -> Result<Self, TrendsError> {
        Self::with_base_url(timeout_secs, user_agent, hl, DEFAULT_BASE_URL)
    }

    /// Creates a client from the process configuration.
    ///
    /// # Errors
    ///
    /// Same as [`TrendsClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, TrendsError> {
        Self::with_base_url(
            config.trends_timeout_secs,
            &config.user_agent,
            &config.trends_hl,
            &config.trends_base_url,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TrendsError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`TrendsError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        hl: &str,
        base_url: &str,
    ) -> Result<Self, TrendsError> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so that `Url::join` appends to the base
        // path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| TrendsError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            hl: hl.to_owned(),
            timeout,
        })
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, TrendsError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TrendsError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("hl", &self.hl);
            pairs.append_pair("tz", "0");
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends a GET request, asserts a 2xx status, and returns the raw body.
    async fn request_text(&self, url: Url) -> Result<String, TrendsError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TrendsError::from_reqwest(e, self.timeout))?;
        let response = response
            .error_for_status()
            .map_err(|e| TrendsError::from_reqwest(e, self.timeout))?;
        response
            .text()
            .await
            .map_err(|e| TrendsError::from_reqwest(e, self.timeout))
    }
}

/// `geo` parameter for a region code. The worldwide view is an empty geo.
fn geo_for(region: &str) -> &str {
    if region.eq_ignore_ascii_case("global") {
        ""
    } else {
        region
    }
}

/// Explore `time` window ending on `end`, e.g. `2020-07-12 2020-07-20`.
fn timeline_window(end: NaiveDate, lookback_days: u32) -> String {
    let start = end
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN);
    format!("{} {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

#[async_trait]
impl TrendsSource for TrendsClient {
    async fn fetch_region_trends(
        &self,
        region: &str,
        date: NaiveDate,
    ) -> Result<Vec<TrendTopic>, TrendsError> {
        let ed = date.format("%Y%m%d").to_string();
        let url = self.build_url(
            DAILY_TRENDS_PATH,
            &[("geo", region), ("ed", &ed), ("ns", DAILY_TRENDS_PAGE_SIZE)],
        )?;
        let body = self.request_text(url).await?;
        let topics = parse_daily_trends(&body)?;
        tracing::debug!(region, count = topics.len(), "fetched daily trends");
        Ok(topics)
    }

    async fn fetch_timeline(
        &self,
        topic: &str,
        region: &str,
        lookback_days: u32,
    ) -> Result<TimelineSeries, TrendsError> {
        let time = timeline_window(Utc::now().date_naive(), lookback_days);
        let explore_req = serde_json::json!({
            "comparisonItem": [{ "keyword": topic, "geo": geo_for(region), "time": time }],
            "category": 0,
            "property": "",
        })
        .to_string();

        let url = self.build_url(EXPLORE_PATH, &[("req", &explore_req)])?;
        let body = self.request_text(url).await?;
        let widget = parse_timeseries_widget(&body)?;

        let widget_req = widget.request.to_string();
        let url = self.build_url(
            MULTILINE_PATH,
            &[("req", &widget_req), ("token", &widget.token)],
        )?;
        let body = self.request_text(url).await?;
        let series = parse_timeline(&body)?;
        tracing::debug!(topic, region, points = series.len(), "fetched timeline");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> TrendsClient {
        TrendsClient::with_base_url(30, "trendmap-test", "en-US", base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_appends_path_and_common_params() {
        let client = test_client("https://trends.google.com");
        let url = client
            .build_url(DAILY_TRENDS_PATH, &[("geo", "US"), ("ed", "20200720")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://trends.google.com/trends/api/dailytrends?hl=en-US&tz=0&geo=US&ed=20200720"
        );
    }

    #[test]
    fn build_url_keeps_base_path_prefix() {
        let client = test_client("http://127.0.0.1:9000/proxy/");
        let url = client.build_url(EXPLORE_PATH, &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/proxy/trends/api/explore?hl=en-US&tz=0"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = TrendsClient::with_base_url(30, "ua", "en-US", "not a url").unwrap_err();
        assert!(matches!(err, TrendsError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn global_region_maps_to_empty_geo() {
        assert_eq!(geo_for("global"), "");
        assert_eq!(geo_for("GLOBAL"), "");
        assert_eq!(geo_for("US"), "US");
    }

    #[test]
    fn timeline_window_spans_lookback_days() {
        let end = NaiveDate::from_ymd_opt(2020, 7, 20).unwrap();
        assert_eq!(timeline_window(end, 8), "2020-07-12 2020-07-20");
        assert_eq!(timeline_window(end, 0), "2020-07-20 2020-07-20");
    }
}
