//! Lightweight re-ranking of the head of a scored list

use serde::{Deserialize, Serialize};

use super::{ScoredRecord, cosine_similarity, token_jaccard};
use crate::text::tokenize;

/// Re-ranking parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Only this many leading items are re-ranked
    pub top_k: usize,
    /// Boost when the whole query phrase appears in the text
    pub phrase_weight: f64,
    /// Weight of query/text token Jaccard
    pub jaccard_weight: f64,
    /// Upper bound on the combined lexical boost
    pub boost_cap: f64,
    /// Cosine above which two items count as near-duplicates
    pub near_duplicate_threshold: f32,
    /// Penalty per already-selected near-duplicate
    pub near_duplicate_penalty: f64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            phrase_weight: 0.10,
            jaccard_weight: 0.10,
            boost_cap: 0.15,
            near_duplicate_threshold: 0.92,
            near_duplicate_penalty: 0.10,
        }
    }
}

/// Capped boost from phrase containment and token overlap
pub fn lexical_overlap_boost(query: &str, text: &str, config: &RerankConfig) -> f64 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    // Padding keeps the phrase match on token boundaries
    let phrase = format!(" {} ", query_tokens.join(" "));
    let haystack = format!(" {} ", tokenize(text).join(" "));
    let phrase_hit = if haystack.contains(&phrase) { 1.0 } else { 0.0 };

    let boost =
        config.phrase_weight * phrase_hit + config.jaccard_weight * token_jaccard(query, text);
    boost.min(config.boost_cap).max(0.0)
}

/// Penalty for each selected vector the candidate nearly duplicates
pub fn near_duplicate_penalty<'a, I>(
    candidate: Option<&[f32]>,
    selected: I,
    config: &RerankConfig,
) -> f64
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let Some(candidate) = candidate else {
        return 0.0;
    };
    let near = selected
        .into_iter()
        .filter(|other| cosine_similarity(candidate, other) > config.near_duplicate_threshold)
        .count();
    config.near_duplicate_penalty * near as f64
}

/// Re-rank the first `top_k` items and append the rest untouched.
///
/// Each head item is boosted by lexical overlap with the query, then items are
/// picked greedily: every step takes the remaining item with the highest boosted
/// score minus its near-duplicate penalty against what was already picked.
/// Ties go to the earlier item. Picked items carry their adjusted score.
pub fn rerank(query: &str, items: Vec<ScoredRecord>, config: &RerankConfig) -> Vec<ScoredRecord> {
    if items.is_empty() || config.top_k == 0 {
        return items;
    }

    let mut items = items;
    let split = config.top_k.min(items.len());
    let tail = items.split_off(split);

    let mut pool: Vec<(ScoredRecord, f64)> = items
        .into_iter()
        .map(|item| {
            let boosted = item.score + lexical_overlap_boost(query, &item.record.text, config);
            (item, boosted)
        })
        .collect();

    let mut selected: Vec<ScoredRecord> = Vec::with_capacity(pool.len() + tail.len());
    while !pool.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (idx, (item, boosted)) in pool.iter().enumerate() {
            let penalty = near_duplicate_penalty(
                item.vector.as_deref(),
                selected.iter().filter_map(|s| s.vector.as_deref()),
                config,
            );
            let adjusted = boosted - penalty;
            if adjusted > best_score {
                best_score = adjusted;
                best_idx = idx;
            }
        }

        let (mut item, _) = pool.remove(best_idx);
        item.score = best_score;
        selected.push(item);
    }

    tracing::debug!(reranked = split, appended = tail.len(), "Re-ranked candidates");
    selected.extend(tail);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemoryRecord, Speaker};
    use crate::scoring::ScoreComponents;

    fn scored(id: &str, text: &str, score: f64, vector: Option<Vec<f32>>) -> ScoredRecord {
        ScoredRecord {
            record: MemoryRecord::builder("c1", 1, Speaker::User, text)
                .id(id)
                .pii_masked(true)
                .build()
                .unwrap(),
            vector,
            score,
            components: ScoreComponents::default(),
        }
    }

    fn ids(items: &[ScoredRecord]) -> Vec<&str> {
        items.iter().map(|s| s.record.id.as_str()).collect()
    }

    #[test]
    fn test_boost_is_capped() {
        let config = RerankConfig::default();
        let boost = lexical_overlap_boost("dinner plans", "dinner plans", &config);
        assert!((boost - config.boost_cap).abs() < 1e-12);
        assert_eq!(lexical_overlap_boost("", "dinner plans", &config), 0.0);
        assert_eq!(lexical_overlap_boost("garden", "dinner plans", &config), 0.0);
    }

    #[test]
    fn test_phrase_respects_token_boundaries() {
        let config = RerankConfig {
            jaccard_weight: 0.0,
            ..Default::default()
        };
        assert_eq!(lexical_overlap_boost("art", "we went to the party", &config), 0.0);
        assert!(lexical_overlap_boost("the party", "we went to the party", &config) > 0.0);
    }

    #[test]
    fn test_phrase_match_lifts_item() {
        let items = vec![
            scored("a", "something about weather", 0.50, None),
            scored("b", "remember the birthday gift", 0.45, None),
        ];
        let out = rerank("birthday gift", items, &RerankConfig::default());
        assert_eq!(ids(&out), vec!["b", "a"]);
    }

    #[test]
    fn test_near_duplicates_are_spread_out() {
        let same = Some(vec![1.0, 0.0]);
        let other = Some(vec![0.0, 1.0]);
        let items = vec![
            scored("a", "x", 0.80, same.clone()),
            scored("b", "y", 0.78, same),
            scored("c", "z", 0.75, other),
        ];
        let out = rerank("unrelated", items, &RerankConfig::default());
        assert_eq!(ids(&out), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_tail_is_appended_in_order() {
        let items: Vec<_> = (0..5)
            .map(|i| scored(&format!("r{i}"), "text", 1.0 - i as f64 * 0.1, None))
            .collect();
        let config = RerankConfig {
            top_k: 2,
            ..Default::default()
        };
        let out = rerank("query", items, &config);
        assert_eq!(ids(&out), vec!["r0", "r1", "r2", "r3", "r4"]);
        assert!((out[4].score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert!(rerank("q", Vec::new(), &RerankConfig::default()).is_empty());
    }
}
