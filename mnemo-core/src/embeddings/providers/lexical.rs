//! Term-frequency profile embedding

use super::EmbeddingProvider;
use crate::embeddings::l2_normalize;
use crate::text::{term_frequencies, tokenize};

/// Deterministic lexical placeholder embedding.
///
/// Slot `i` holds the relative frequency of the `i`-th most frequent term
/// (ties broken alphabetically); the vector is zero padded and L2-normalized.
#[derive(Debug, Clone)]
pub struct LexicalEmbeddings {
    dimension: usize,
}

impl LexicalEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for LexicalEmbeddings {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingProvider for LexicalEmbeddings {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);
        if tokens.is_empty() || self.dimension == 0 {
            return vector;
        }

        let total = tokens.len() as f32;
        let mut ranked: Vec<(&str, usize)> = term_frequencies(&tokens).into_iter().collect();
        // BTreeMap order is alphabetical, and the sort is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        for (slot, (_, count)) in vector.iter_mut().zip(ranked.iter()) {
            *slot = *count as f32 / total;
        }

        l2_normalize(&mut vector);
        vector
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}
