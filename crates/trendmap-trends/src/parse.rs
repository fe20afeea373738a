//! Parsers for Google Trends JSON payloads.
//!
//! Every endpoint prefixes its body with an anti-XSSI guard (`)]}'`, sometimes
//! followed by a comma) that must be stripped before the JSON is readable.

use serde::Deserialize;
use trendmap_core::{Article, TimelinePoint, TimelineSeries, TrendTopic};

use crate::error::TrendsError;

const XSSI_PREFIX: &str = ")]}'";

/// Identifier of the explore widget that carries the interest-over-time token.
pub const TIMESERIES_WIDGET_ID: &str = "TIMESERIES";

/// Remove the anti-XSSI guard, if present.
#[must_use]
pub fn strip_xssi_prefix(body: &str) -> &str {
    let trimmed = body.trim_start();
    match trimmed.strip_prefix(XSSI_PREFIX) {
        Some(rest) => rest.trim_start_matches(',').trim_start(),
        None => trimmed,
    }
}

fn from_guarded_json<T: for<'de> Deserialize<'de>>(
    body: &str,
    context: &str,
) -> Result<T, TrendsError> {
    serde_json::from_str(strip_xssi_prefix(body)).map_err(|e| TrendsError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Daily trends
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DailyTrendsEnvelope {
    default: DailyTrendsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyTrendsBody {
    #[serde(default)]
    trending_searches_days: Vec<TrendingSearchesDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingSearchesDay {
    #[serde(default)]
    trending_searches: Vec<TrendingSearch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingSearch {
    title: SearchTitle,
    #[serde(default)]
    formatted_traffic: String,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchTitle {
    query: String,
    #[serde(default)]
    explore_link: String,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: String,
    url: String,
}

/// Parse a `dailytrends` response into topics, most recent day only.
///
/// A response with no trending days yields an empty list. Entries with a
/// blank query are dropped.
///
/// # Errors
///
/// Returns [`TrendsError::Deserialize`] if the body is not the expected JSON
/// shape.
pub fn parse_daily_trends(body: &str) -> Result<Vec<TrendTopic>, TrendsError> {
    let envelope: DailyTrendsEnvelope = from_guarded_json(body, "dailytrends")?;

    let Some(day) = envelope.default.trending_searches_days.into_iter().next() else {
        return Ok(Vec::new());
    };

    let topics = day
        .trending_searches
        .into_iter()
        .filter(|s| !s.title.query.trim().is_empty())
        .map(|s| TrendTopic {
            topic: s.title.query,
            traffic: s.formatted_traffic,
            explore_link: s.title.explore_link,
            articles: s
                .articles
                .into_iter()
                .map(|a| Article {
                    title: a.title,
                    url: a.url,
                })
                .collect(),
        })
        .collect();

    Ok(topics)
}

// ---------------------------------------------------------------------------
// Explore widgets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<ExploreWidget>,
}

#[derive(Debug, Deserialize)]
struct ExploreWidget {
    id: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    request: Option<serde_json::Value>,
}

/// Token and request payload needed to fetch one widget's data.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetRequest {
    pub token: String,
    pub request: serde_json::Value,
}

/// Extract the `TIMESERIES` widget from an `explore` response.
///
/// # Errors
///
/// Returns [`TrendsError::Deserialize`] for an unreadable body and
/// [`TrendsError::Malformed`] if the widget, its token, or its request is
/// missing.
pub fn parse_timeseries_widget(body: &str) -> Result<WidgetRequest, TrendsError> {
    let explore: ExploreResponse = from_guarded_json(body, "explore")?;

    let widget = explore
        .widgets
        .into_iter()
        .find(|w| w.id == TIMESERIES_WIDGET_ID)
        .ok_or_else(|| {
            TrendsError::Malformed(format!("explore response has no {TIMESERIES_WIDGET_ID} widget"))
        })?;

    match (widget.token, widget.request) {
        (Some(token), Some(request)) if !token.is_empty() => Ok(WidgetRequest { token, request }),
        _ => Err(TrendsError::Malformed(format!(
            "{TIMESERIES_WIDGET_ID} widget is missing its token or request"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Interest over time
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TimelineEnvelope {
    default: TimelineBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineBody {
    #[serde(default)]
    timeline_data: Vec<RawTimelinePoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimelinePoint {
    formatted_time: String,
    #[serde(default)]
    value: Vec<f64>,
}

/// Parse a `widgetdata/multiline` response into a popularity series.
///
/// Only the first comparison value of each point is used. Values are rounded
/// and clamped to `0..=100`.
///
/// # Errors
///
/// Returns [`TrendsError::Deserialize`] for an unreadable body and
/// [`TrendsError::Malformed`] if a point carries no value.
pub fn parse_timeline(body: &str) -> Result<TimelineSeries, TrendsError> {
    let envelope: TimelineEnvelope = from_guarded_json(body, "widgetdata/multiline")?;

    envelope
        .default
        .timeline_data
        .into_iter()
        .map(|point| {
            let raw = point.value.first().copied().ok_or_else(|| {
                TrendsError::Malformed(format!(
                    "timeline point '{}' has no value",
                    point.formatted_time
                ))
            })?;
            Ok(TimelinePoint {
                label: point.formatted_time,
                value: clamp_popularity(raw),
            })
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_popularity(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
