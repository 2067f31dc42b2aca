//! Scoring building blocks for retrieval.
//!
//! Everything here is pure: functions take records, vectors and text and
//! return scores in `[0, 1]`. Degenerate input (empty text, mismatched or
//! zero vectors) scores 0 rather than failing.

pub mod dedup;
pub mod rerank;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::pii;
use crate::record::{Facets, MemoryRecord};
use crate::text::{term_frequencies, tokenize};

pub use dedup::{dedup_global, token_jaccard};
pub use rerank::{RerankConfig, lexical_overlap_boost, near_duplicate_penalty, rerank};

/// BM25 term-frequency saturation
const BM25_K1: f64 = 1.2;
/// BM25 length normalization strength
const BM25_B: f64 = 0.75;
/// Typical dialogue turn length in tokens, used as the average document length
const REFERENCE_DOC_LEN: f64 = 12.0;

/// Cosine similarity in `[-1, 1]`; 0 on mismatched length, empty or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Saturating term-frequency score scaled into `[0, 1]`.
///
/// Each distinct query term contributes `tf·(k1+1) / (tf + k1·(1 − b + b·len/avg))`,
/// which approaches `k1 + 1` as the term repeats; the sum is divided by that
/// ceiling times the number of distinct query terms.
pub fn lexical_score<S: AsRef<str>, T: AsRef<str>>(query_terms: &[S], doc_terms: &[T]) -> f64 {
    if query_terms.is_empty() || doc_terms.is_empty() {
        return 0.0;
    }

    let doc_tf = term_frequencies(doc_terms);
    let distinct_query: HashSet<&str> = query_terms.iter().map(|t| t.as_ref()).collect();
    let length_norm = 1.0 - BM25_B + BM25_B * (doc_terms.len() as f64 / REFERENCE_DOC_LEN);

    let score: f64 = distinct_query
        .iter()
        .filter_map(|term| doc_tf.get(term))
        .map(|&tf| {
            let tf = tf as f64;
            tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * length_norm)
        })
        .sum();

    let max = (BM25_K1 + 1.0) * distinct_query.len() as f64;
    (score / max).clamp(0.0, 1.0)
}

/// Exponential half-life decay: 1 at age 0, halving every `half_life`.
///
/// Negative ages count as 0. A non-positive half-life decays instantly.
pub fn recency_decay(age: f64, half_life: f64) -> f64 {
    let age = if age.is_finite() { age.max(0.0) } else { 0.0 };
    if half_life.is_nan() || half_life <= 0.0 {
        return if age == 0.0 { 1.0 } else { 0.0 };
    }
    0.5f64.powf(age / half_life).max(0.0)
}

/// Fraction of `targets` found among the record's facet kinds or values.
pub fn facet_bonus<S: AsRef<str>>(facets: &Facets, targets: &[S]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let matched = targets
        .iter()
        .filter(|t| facets.matches(t.as_ref()))
        .count();
    matched as f64 / targets.len() as f64
}

/// Age of a record in hours relative to `now`
pub fn age_hours(record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    (now - record.timestamp).num_milliseconds() as f64 / 3_600_000.0
}

/// Weights for the batch scorer's four signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub lexical: f64,
    pub cosine: f64,
    pub recency: f64,
    pub facet: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            lexical: 0.35,
            cosine: 0.35,
            recency: 0.20,
            facet: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Weights scaled to sum to 1. Degenerate input falls back to the defaults.
    pub fn normalized(&self) -> Self {
        let parts = [self.lexical, self.cosine, self.recency, self.facet];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Self::default();
        }
        let total: f64 = parts.iter().sum();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            lexical: self.lexical / total,
            cosine: self.cosine / total,
            recency: self.recency / total,
            facet: self.facet / total,
        }
    }
}

/// Per-signal scores, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub lexical: f64,
    pub cosine: f64,
    pub recency: f64,
    pub facet: f64,
}

/// A record with its vector, waiting to be scored
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: MemoryRecord,
    pub vector: Option<Vec<f32>>,
}

/// A scored record flowing through rerank and dedup
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub vector: Option<Vec<f32>>,
    pub score: f64,
    pub components: ScoreComponents,
}

/// What the batch scorer compares candidates against
#[derive(Debug, Clone, Default)]
pub struct ScoringQuery {
    pub text: String,
    pub vector: Option<Vec<f32>>,
    pub facets: Vec<String>,
}

/// Score, gate and sort candidates.
///
/// Candidates that fail the PII gate are dropped outright. Results are sorted
/// by descending combined score; equal scores keep input order.
pub fn score_batch(
    query: &ScoringQuery,
    candidates: Vec<Candidate>,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
    half_life_hours: f64,
) -> Vec<ScoredRecord> {
    let weights = weights.normalized();
    let query_terms = tokenize(&query.text);

    let mut scored: Vec<ScoredRecord> = candidates
        .into_iter()
        .filter(|c| pii::passes_gate(&c.record))
        .map(|c| {
            let doc_terms = tokenize(&c.record.text);
            let cosine = match (&query.vector, &c.vector) {
                (Some(q), Some(v)) => f64::from(cosine_similarity(q, v)).max(0.0),
                _ => 0.0,
            };
            let components = ScoreComponents {
                lexical: lexical_score(&query_terms, &doc_terms),
                cosine,
                recency: recency_decay(age_hours(&c.record, now), half_life_hours),
                facet: facet_bonus(&c.record.facets, &query.facets),
            };
            let score = weights.lexical * components.lexical
                + weights.cosine * components.cosine
                + weights.recency * components.recency
                + weights.facet * components.facet;

            ScoredRecord {
                record: c.record,
                vector: c.vector,
                score,
                components,
            }
        })
        .collect();

    sort_by_score(&mut scored);
    scored
}

/// Stable descending sort by score
pub fn sort_by_score(items: &mut [ScoredRecord]) {
    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
