//! Configuration types for the memory engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{MnemoError, Result};
use crate::scoring::ScoringWeights;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MnemoConfig {
    /// Store file location
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding provider selection
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Retrieval and ranking parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Expiry and capacity limits
    #[serde(default)]
    pub forget: ForgetConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON store file. `None` keeps everything in memory.
    #[serde(default = "default_store_path")]
    pub path: Option<PathBuf>,
}

fn default_store_path() -> Option<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("./data"));
    Some(base.join("mnemo").join("store.json"))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Store backed by the given file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Term-frequency profile of the most frequent terms
    #[default]
    Lexical,
    /// Feature-hashed bag of words
    Hashed,
}

/// Embeddings configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Vector length produced by the provider
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_dimension() -> usize {
    64
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            dimension: default_dimension(),
        }
    }
}

/// Weights for the hybrid retrieval blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    /// Embedding similarity to the query
    pub similarity: f64,
    /// Turn-distance locality around the conversation cursor
    pub turn_recency: f64,
    /// Wall-clock freshness of the record
    pub time_recency: f64,
    /// Facet overlap with the request
    pub facet: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            similarity: 0.45,
            turn_recency: 0.30,
            time_recency: 0.15,
            facet: 0.10,
        }
    }
}

impl HybridWeights {
    /// Weights scaled to sum to 1. Degenerate input falls back to the defaults.
    pub fn normalized(&self) -> Self {
        let parts = [
            self.similarity,
            self.turn_recency,
            self.time_recency,
            self.facet,
        ];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Self::default();
        }
        let total: f64 = parts.iter().sum();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            similarity: self.similarity / total,
            turn_recency: self.turn_recency / total,
            time_recency: self.time_recency / total,
            facet: self.facet / total,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Hybrid mode fetches `k * candidate_multiplier` nearest neighbours
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    #[serde(default)]
    pub hybrid_weights: HybridWeights,

    /// Weights of the multi-signal ranking used by `MemoryEngine::rank`
    #[serde(default)]
    pub ranking_weights: ScoringWeights,

    /// Per-turn falloff of the turn recency boost
    #[serde(default = "default_turn_decay")]
    pub turn_decay: f64,

    /// Lower clamp of the turn recency boost
    #[serde(default = "default_turn_recency_floor")]
    pub turn_recency_floor: f64,

    /// Half-life for wall-clock recency decay
    #[serde(default = "default_half_life_hours")]
    pub recency_half_life_hours: f64,

    /// Number of leading results that go through the re-ranking pass
    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,

    /// Cosine above which two reranked items count as near duplicates
    #[serde(default = "default_near_duplicate_threshold")]
    pub near_duplicate_threshold: f32,

    /// Token-Jaccard at which texts collapse in the global dedup pass
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,
}

fn default_k() -> usize {
    5
}

fn default_candidate_multiplier() -> usize {
    2
}

fn default_turn_decay() -> f64 {
    0.1
}

fn default_turn_recency_floor() -> f64 {
    0.2
}

fn default_half_life_hours() -> f64 {
    72.0
}

fn default_rerank_top_k() -> usize {
    10
}

fn default_near_duplicate_threshold() -> f32 {
    0.92
}

fn default_dedup_threshold() -> f64 {
    0.85
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            candidate_multiplier: default_candidate_multiplier(),
            hybrid_weights: HybridWeights::default(),
            ranking_weights: ScoringWeights::default(),
            turn_decay: default_turn_decay(),
            turn_recency_floor: default_turn_recency_floor(),
            recency_half_life_hours: default_half_life_hours(),
            rerank_top_k: default_rerank_top_k(),
            near_duplicate_threshold: default_near_duplicate_threshold(),
            dedup_threshold: default_dedup_threshold(),
        }
    }
}

/// Forget policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgetConfig {
    /// TTL assigned to records at ingest
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: f64,

    /// Maximum records kept per conversation during cleanup
    #[serde(default = "default_per_conversation_cap")]
    pub per_conversation_cap: usize,

    /// Store size that triggers eviction on ingest
    #[serde(default = "default_global_ceiling")]
    pub global_ceiling: usize,
}

fn default_ttl_days() -> f64 {
    30.0
}

fn default_per_conversation_cap() -> usize {
    500
}

fn default_global_ceiling() -> usize {
    5000
}

impl Default for ForgetConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
            per_conversation_cap: default_per_conversation_cap(),
            global_ceiling: default_global_ceiling(),
        }
    }
}

/// Builder for MnemoConfig
pub struct ConfigBuilder {
    config: MnemoConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MnemoConfig::default(),
        }
    }

    pub fn store(mut self, config: StoreConfig) -> Self {
        self.config.store = config;
        self
    }

    pub fn embeddings(mut self, config: EmbeddingsConfig) -> Self {
        self.config.embeddings = config;
        self
    }

    pub fn retrieval(mut self, config: RetrievalConfig) -> Self {
        self.config.retrieval = config;
        self
    }

    pub fn forget(mut self, config: ForgetConfig) -> Self {
        self.config.forget = config;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<MnemoConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MnemoConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `mnemo.toml` in the working directory
    /// 3. The file named by `MNEMO_CONFIG_PATH`
    /// 4. `MNEMO_` environment overrides, nested with `__`
    ///    (e.g. `MNEMO_FORGET__DEFAULT_TTL_DAYS=7`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is invalid or fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(MnemoConfig::default()))
            .merge(Toml::file("mnemo.toml"));

        if let Ok(path) = std::env::var("MNEMO_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(
            Env::prefixed("MNEMO_")
                .ignore(&["config_path"])
                .split("__"),
        );

        let config: MnemoConfig = figment.extract().map_err(|e| {
            MnemoError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: MnemoConfig = Figment::from(Serialized::defaults(MnemoConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                MnemoError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimension == 0 {
            return Err(MnemoError::Configuration(
                "embeddings.dimension must be positive".to_string(),
            ));
        }

        let retrieval = &self.retrieval;
        if retrieval.candidate_multiplier == 0 {
            return Err(MnemoError::Configuration(
                "retrieval.candidate_multiplier must be positive".to_string(),
            ));
        }
        if !(retrieval.recency_half_life_hours > 0.0) {
            return Err(MnemoError::Configuration(
                "retrieval.recency_half_life_hours must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&retrieval.turn_recency_floor) {
            return Err(MnemoError::Configuration(
                "retrieval.turn_recency_floor must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&retrieval.near_duplicate_threshold) {
            return Err(MnemoError::Configuration(
                "retrieval.near_duplicate_threshold must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&retrieval.dedup_threshold) {
            return Err(MnemoError::Configuration(
                "retrieval.dedup_threshold must be within [0, 1]".to_string(),
            ));
        }

        let forget = &self.forget;
        if !(forget.default_ttl_days > 0.0) {
            return Err(MnemoError::Configuration(
                "forget.default_ttl_days must be positive".to_string(),
            ));
        }
        if forget.per_conversation_cap == 0 || forget.global_ceiling == 0 {
            return Err(MnemoError::Configuration(
                "forget caps must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MnemoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.embeddings.dimension, 64);
        assert_eq!(config.retrieval.rerank_top_k, 10);
    }

    #[test]
    fn test_hybrid_weights_normalized() {
        let weights = HybridWeights {
            similarity: 2.0,
            turn_recency: 1.0,
            time_recency: 1.0,
            facet: 0.0,
        }
        .normalized();

        assert!((weights.similarity - 0.5).abs() < 1e-9);
        let sum = weights.similarity + weights.turn_recency + weights.time_recency + weights.facet;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_weights_fall_back() {
        let weights = HybridWeights {
            similarity: 0.0,
            turn_recency: 0.0,
            time_recency: 0.0,
            facet: 0.0,
        };
        assert_eq!(weights.normalized(), HybridWeights::default());
    }

    #[test]
    fn test_builder_rejects_zero_dimension() {
        let result = ConfigBuilder::new()
            .embeddings(EmbeddingsConfig {
                dimension: 0,
                ..Default::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_partial_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mnemo.toml");
        std::fs::write(
            &path,
            r#"
[embeddings]
provider = "hashed"
dimension = 128

[forget]
default_ttl_days = 7.0
"#,
        )
        .unwrap();

        let config = MnemoConfig::from_file(&path).unwrap();
        assert_eq!(config.embeddings.provider, EmbeddingProviderKind::Hashed);
        assert_eq!(config.embeddings.dimension, 128);
        assert_eq!(config.forget.default_ttl_days, 7.0);
        assert_eq!(config.forget.per_conversation_cap, 500);
    }

    #[test]
    fn test_from_file_invalid_threshold() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mnemo.toml");
        std::fs::write(&path, "[retrieval]\ndedup_threshold = 1.5\n").unwrap();

        assert!(MnemoConfig::from_file(&path).is_err());
    }
}
