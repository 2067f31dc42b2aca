//! Embedding provider implementations

/// Trait for embedding provider implementations.
///
/// Providers must be deterministic, must not perform I/O and must never fail:
/// text that yields no terms maps to the zero vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text.
    ///
    /// # Returns
    ///
    /// A vector of length [`dimension`](Self::dimension), unit norm or all zeros
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Generate embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

pub mod hashed;
pub mod lexical;

pub use hashed::HashedEmbeddings;
pub use lexical::LexicalEmbeddings;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_batch_matches_single() {
        let providers: Vec<Box<dyn EmbeddingProvider>> = vec![
            Box::new(LexicalEmbeddings::new(16)),
            Box::new(HashedEmbeddings::new(16)),
        ];
        for provider in providers {
            let batch = provider.embed_batch(&["first text", "", "second text here"]);
            assert_eq!(batch.len(), 3);
            assert_eq!(batch[0], provider.embed("first text"));
            assert_eq!(batch[1], vec![0.0; 16]);
            assert!(batch.iter().all(|v| v.len() == provider.dimension()));
        }
    }
}
