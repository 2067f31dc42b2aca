//! Factory for creating embedding providers from configuration

use std::sync::Arc;

use crate::config::{EmbeddingProviderKind, EmbeddingsConfig};
use crate::embeddings::providers::{EmbeddingProvider, HashedEmbeddings, LexicalEmbeddings};
use crate::error::{MnemoError, Result};

/// Factory for creating embedding providers
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// Create an embedding provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configured dimension is zero
    pub fn create(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        if config.dimension == 0 {
            return Err(MnemoError::Configuration(
                "embedding dimension must be positive".to_string(),
            ));
        }

        let provider: Arc<dyn EmbeddingProvider> = match config.provider {
            EmbeddingProviderKind::Lexical => Arc::new(LexicalEmbeddings::new(config.dimension)),
            EmbeddingProviderKind::Hashed => Arc::new(HashedEmbeddings::new(config.dimension)),
        };

        tracing::debug!(
            provider = provider.name(),
            dimension = provider.dimension(),
            "Created embedding provider"
        );
        Ok(provider)
    }
}
