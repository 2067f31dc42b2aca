//! Feature-hashed bag-of-words embedding

use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::embeddings::l2_normalize;
use crate::text::{term_frequencies, tokenize};

/// Hashes each term into a signed bucket.
///
/// Unlike [`LexicalEmbeddings`](super::LexicalEmbeddings) the slot a term
/// lands in depends on the term itself, so cosine similarity follows
/// vocabulary overlap. SHA-256 keeps bucket assignment stable across
/// platforms and releases.
#[derive(Debug, Clone)]
pub struct HashedEmbeddings {
    dimension: usize,
}

impl HashedEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, term: &str) -> (usize, f32) {
        let digest = Sha256::digest(term.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        let value = u64::from_le_bytes(raw);
        let index = (value % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashedEmbeddings {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingProvider for HashedEmbeddings {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }

        let tokens = tokenize(text);
        for (term, count) in term_frequencies(&tokens) {
            let (index, sign) = self.bucket(term);
            vector[index] += sign * count as f32;
        }

        l2_normalize(&mut vector);
        vector
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "hashed"
    }
}
