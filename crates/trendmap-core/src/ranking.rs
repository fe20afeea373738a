//! Global ranking engine.
//!
//! Turns the per-region trend lists of one snapshot into a ranked list of
//! topics by the number of regions they trend in.

use std::collections::{HashMap, HashSet};

use crate::types::{GlobalTrend, RegionTrends};

/// Maximum number of entries in a global ranking.
pub const GLOBAL_TREND_LIMIT: usize = 10;

/// Rank topics by the number of distinct regions they appear in.
///
/// Topics are matched by exact, case-sensitive string equality. A topic listed
/// twice by the same region counts once for that region. The result is sorted
/// by count descending and capped at [`GLOBAL_TREND_LIMIT`]; equal counts keep
/// the order in which topics were first seen scanning regions in input order.
///
/// Empty input yields an empty ranking.
#[must_use]
pub fn rank(region_trends: &[RegionTrends]) -> Vec<GlobalTrend> {
    let mut ranked: Vec<GlobalTrend> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for region in region_trends {
        let mut seen_in_region: HashSet<&str> = HashSet::new();
        for trend in &region.trends {
            let topic = trend.topic.as_str();
            if !seen_in_region.insert(topic) {
                continue;
            }
            if let Some(&pos) = positions.get(topic) {
                ranked[pos].count += 1;
            } else {
                positions.insert(topic, ranked.len());
                ranked.push(GlobalTrend {
                    topic: topic.to_string(),
                    count: 1,
                });
            }
        }
    }

    // `sort_by` is stable, which preserves first-seen order between ties.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(GLOBAL_TREND_LIMIT);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendTopic;

    fn region(code: &str, topics: &[&str]) -> RegionTrends {
        RegionTrends {
            region: code.to_string(),
            trends: topics
                .iter()
                .map(|t| TrendTopic {
                    topic: (*t).to_string(),
                    traffic: "1K+".to_string(),
                    explore_link: String::new(),
                    articles: vec![],
                })
                .collect(),
        }
    }

    fn gt(topic: &str, count: u32) -> GlobalTrend {
        GlobalTrend {
            topic: topic.to_string(),
            count,
        }
    }

    #[test]
    fn ranks_topics_by_region_count() {
        let input = vec![
            region("UA", &["Trump", "Corona"]),
            region("US", &["Trump", "Corona"]),
            region("UK", &["Trump"]),
            region("AR", &["Dogs"]),
        ];
        assert_eq!(
            rank(&input),
            vec![gt("Trump", 3), gt("Corona", 2), gt("Dogs", 1)]
        );
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn regions_without_trends_contribute_nothing() {
        let input = vec![region("US", &[]), region("UK", &[])];
        assert!(rank(&input).is_empty());
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let input = vec![
            region("US", &["Zebra", "Apple"]),
            region("UK", &["Mango", "Apple", "Zebra"]),
        ];
        assert_eq!(
            rank(&input),
            vec![gt("Zebra", 2), gt("Apple", 2), gt("Mango", 1)]
        );
    }

    #[test]
    fn duplicate_topic_within_a_region_counts_once() {
        let input = vec![region("US", &["Dogs", "Dogs"]), region("UK", &["Cats"])];
        assert_eq!(rank(&input), vec![gt("Dogs", 1), gt("Cats", 1)]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let input = vec![region("US", &["dogs"]), region("UK", &["Dogs"])];
        assert_eq!(rank(&input), vec![gt("dogs", 1), gt("Dogs", 1)]);
    }

    #[test]
    fn caps_ranking_at_ten_entries() {
        let topics: Vec<String> = (0..15).map(|i| format!("topic-{i}")).collect();
        let refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        let input = vec![region("US", &refs), region("UK", &refs[5..])];

        let ranked = rank(&input);

        assert_eq!(ranked.len(), GLOBAL_TREND_LIMIT);
        // topics 5..15 appear in both regions and outrank 0..5.
        assert_eq!(ranked[0], gt("topic-5", 2));
        assert!(ranked.iter().all(|t| t.count == 2));
    }

    #[test]
    fn counts_match_regions_containing_topic_and_are_sorted() {
        let input = vec![
            region("US", &["a", "b", "c"]),
            region("UK", &["c", "d"]),
            region("FR", &["c", "b"]),
            region("DE", &["e"]),
        ];
        let ranked = rank(&input);

        for trend in &ranked {
            let expected = input
                .iter()
                .filter(|r| r.contains_topic(&trend.topic))
                .count();
            assert_eq!(trend.count as usize, expected, "count for {}", trend.topic);
        }
        assert!(ranked.windows(2).all(|w| w[0].count >= w[1].count));
    }
}
