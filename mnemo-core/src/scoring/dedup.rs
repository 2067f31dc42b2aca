//! Global de-duplication over token overlap

use std::collections::HashSet;

use super::ScoredRecord;
use crate::text::token_set;

/// Jaccard index of the two texts' lowercase token sets; 0 when both are empty
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Collapse near-identical texts across a score-sorted list.
///
/// Items are visited in order. One whose token Jaccard with an existing
/// survivor reaches `threshold` competes with that survivor: the later
/// timestamp wins, and equal timestamps go to the higher score. The winner
/// takes the survivor's slot, so survivor order is preserved.
pub fn dedup_global(items: Vec<ScoredRecord>, threshold: f64) -> Vec<ScoredRecord> {
    let before = items.len();
    let mut survivors: Vec<(ScoredRecord, HashSet<String>)> = Vec::with_capacity(items.len());

    for item in items {
        let tokens = token_set(&item.record.text);
        let duplicate_of = survivors
            .iter()
            .position(|(_, kept)| jaccard(&tokens, kept) >= threshold);

        match duplicate_of {
            Some(slot) => {
                let kept = &survivors[slot].0;
                let replaces = match item.record.timestamp.cmp(&kept.record.timestamp) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => item.score > kept.score,
                };
                if replaces {
                    survivors[slot] = (item, tokens);
                }
            }
            None => survivors.push((item, tokens)),
        }
    }

    if survivors.len() < before {
        tracing::debug!(
            removed = before - survivors.len(),
            kept = survivors.len(),
            "Removed duplicate results"
        );
    }
    survivors.into_iter().map(|(item, _)| item).collect()
}
