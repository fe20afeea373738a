use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A news article attached to a trending topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
}

/// One trending search topic as reported for a single region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendTopic {
    pub topic: String,
    /// Approximate search volume as formatted by the source, e.g. `200K+`.
    pub traffic: String,
    pub explore_link: String,
    pub articles: Vec<Article>,
}

/// Trending topics captured for one region, in source ranking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTrends {
    pub region: String,
    pub trends: Vec<TrendTopic>,
}

impl RegionTrends {
    /// Returns `true` if any trend in this region has exactly `topic` as its title.
    #[must_use]
    pub fn contains_topic(&self, topic: &str) -> bool {
        self.trends.iter().any(|t| t.topic == topic)
    }
}

/// A topic ranked by how many regions it trends in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTrend {
    pub topic: String,
    pub count: u32,
}

/// A snapshot that has been built by ingestion but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub captured_at: DateTime<Utc>,
    pub region_trends: Vec<RegionTrends>,
    pub global_trends: Vec<GlobalTrend>,
}

/// A persisted, immutable snapshot of one ingestion cycle.
///
/// Fields are private so a stored entry cannot be mutated after it has been
/// read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    id: i64,
    #[serde(rename = "timestamp", serialize_with = "serialize_millis")]
    captured_at: DateTime<Utc>,
    region_trends: Vec<RegionTrends>,
    global_trends: Vec<GlobalTrend>,
}

impl SnapshotEntry {
    /// Pair a store-assigned id with the snapshot contents.
    #[must_use]
    pub fn new(id: i64, snapshot: NewSnapshot) -> Self {
        Self {
            id,
            captured_at: snapshot.captured_at,
            region_trends: snapshot.region_trends,
            global_trends: snapshot.global_trends,
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Capture time as milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.captured_at.timestamp_millis()
    }

    #[must_use]
    pub fn region_trends(&self) -> &[RegionTrends] {
        &self.region_trends
    }

    #[must_use]
    pub fn global_trends(&self) -> &[GlobalTrend] {
        &self.global_trends
    }

    /// Trends recorded for `region`, or an empty slice if the region was not
    /// captured in this snapshot.
    #[must_use]
    pub fn trends_for_region(&self, region: &str) -> &[TrendTopic] {
        self.region_trends
            .iter()
            .find(|r| r.region == region)
            .map(|r| r.trends.as_slice())
            .unwrap_or_default()
    }
}

fn serialize_millis<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_i64(value.timestamp_millis())
}

/// One point of a topic's popularity time series. `value` is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub label: String,
    pub value: u8,
}

pub type TimelineSeries = Vec<TimelinePoint>;

/// Which slice of a snapshot a caller wants: the global ranking or one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegionSelector {
    Global,
    Region(String),
}

impl FromStr for RegionSelector {
    type Err = CoreError;

    /// Parses `global` (any case) or a region code. Region codes are
    /// upper-cased; they must be non-empty ASCII alphanumerics or `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("global") {
            return Ok(Self::Global);
        }
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(CoreError::InvalidRegion(s.to_string()));
        }
        Ok(Self::Region(trimmed.to_ascii_uppercase()))
    }
}

impl std::fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionSelector::Global => write!(f, "global"),
            RegionSelector::Region(code) => write!(f, "{code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn topic(name: &str) -> TrendTopic {
        TrendTopic {
            topic: name.to_string(),
            traffic: "10K+".to_string(),
            explore_link: format!("/trends/explore?q={name}"),
            articles: vec![],
        }
    }

    fn entry() -> SnapshotEntry {
        SnapshotEntry::new(
            7,
            NewSnapshot {
                captured_at: Utc.with_ymd_and_hms(2020, 7, 1, 12, 0, 0).unwrap(),
                region_trends: vec![RegionTrends {
                    region: "US".to_string(),
                    trends: vec![topic("Live"), topic("Laugh")],
                }],
                global_trends: vec![GlobalTrend {
                    topic: "Live".to_string(),
                    count: 1,
                }],
            },
        )
    }

    #[test]
    fn trends_for_region_returns_region_list() {
        let entry = entry();
        let names: Vec<&str> = entry
            .trends_for_region("US")
            .iter()
            .map(|t| t.topic.as_str())
            .collect();
        assert_eq!(names, vec!["Live", "Laugh"]);
    }

    #[test]
    fn trends_for_missing_region_is_empty() {
        assert!(entry().trends_for_region("AT").is_empty());
    }

    #[test]
    fn trend_topic_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(topic("Dogs")).expect("serialize");
        assert_eq!(json["topic"], "Dogs");
        assert_eq!(json["exploreLink"], "/trends/explore?q=Dogs");
        assert!(json.get("explore_link").is_none());
    }

    #[test]
    fn snapshot_entry_serializes_timestamp_as_epoch_millis() {
        let json = serde_json::to_value(entry()).expect("serialize");
        assert_eq!(json["timestamp"].as_i64(), Some(1_593_604_800_000));
        assert_eq!(json["globalTrends"][0]["topic"], "Live");
        assert_eq!(json["regionTrends"][0]["region"], "US");
    }

    #[test]
    fn region_selector_parses_global_case_insensitively() {
        assert_eq!("GLOBAL".parse::<RegionSelector>(), Ok(RegionSelector::Global));
        assert_eq!("global".parse::<RegionSelector>(), Ok(RegionSelector::Global));
    }

    #[test]
    fn region_selector_uppercases_region_codes() {
        assert_eq!(
            "us".parse::<RegionSelector>(),
            Ok(RegionSelector::Region("US".to_string()))
        );
    }

    #[test]
    fn region_selector_rejects_garbage() {
        assert!("".parse::<RegionSelector>().is_err());
        assert!("U S".parse::<RegionSelector>().is_err());
        assert!("us/../x".parse::<RegionSelector>().is_err());
    }
}
