//! # Mnemo - conversational memory retrieval
//!
//! Mnemo keeps short dialogue turns in a small persisted store and retrieves
//! them with a mix of signals:
//! - Episodic, semantic and hybrid retrieval per conversation
//! - Lexical, cosine, recency and facet scoring with a re-ranking pass
//! - Token-overlap de-duplication of results
//! - TTL expiry and LRU caps that keep the store bounded
//! - A fail-closed PII gate on everything returned
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mnemo_core::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = MnemoConfig::load()?;
//!     let mut engine = MemoryEngine::open(&config)?;
//!
//!     let record = MemoryRecord::builder("c1", 1, Speaker::User, "Let's meet on Friday")
//!         .pii_masked(true)
//!         .facet(FacetKind::Intent, "plan")
//!         .build()?;
//!     engine.ingest(record)?;
//!
//!     let request = RetrieveRequest::new("c1").with_k(3).with_query("friday plans");
//!     for record in engine.retrieve(&request) {
//!         println!("{}: {}", record.turn, record.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Store**: records and vectors in one JSON document, rewritten atomically
//! - **Embeddings**: swappable providers behind [`embeddings::EmbeddingProvider`]
//! - **Scoring**: pure functions plus batch scoring, re-ranking and dedup
//! - **Forget policy**: eviction index persisted beside the store
//! - **Engine**: the facade tying the pieces together

pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod forget;
pub mod persist;
pub mod pii;
pub mod record;
pub mod scoring;
pub mod store;
pub mod text;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{
        ConfigBuilder, EmbeddingProviderKind, EmbeddingsConfig, ForgetConfig, HybridWeights,
        MnemoConfig, RetrievalConfig, StoreConfig,
    };
    pub use crate::embeddings::{
        EmbeddingProvider, EmbeddingProviderFactory, HashedEmbeddings, LexicalEmbeddings,
    };
    pub use crate::engine::{
        ConversationSnapshot, EngineConfig, ForgetRequest, MemoryEngine, RetrievalMode,
        RetrieveFilters, RetrieveRequest,
    };
    pub use crate::error::{MnemoError, Result};
    pub use crate::forget::{CleanupReport, EvictionEntry, ForgetPolicy, RecordState};
    pub use crate::record::{FacetKind, Facets, MemoryKind, MemoryRecord, RecordBuilder, Speaker};
    pub use crate::scoring::{RerankConfig, ScoredRecord, ScoringWeights};
    pub use crate::store::{StoreFilter, VectorStore};
}
