//! Memory engine: ingest, retrieval, forgetting and stats over one store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{MnemoConfig, RetrievalConfig};
use crate::embeddings::{EmbeddingProvider, EmbeddingProviderFactory};
use crate::error::{MnemoError, Result};
use crate::forget::{CleanupReport, ForgetPolicy, index_path_for};
use crate::pii;
use crate::record::{MemoryKind, MemoryRecord, Speaker};
use crate::scoring::{
    Candidate, RerankConfig, ScoreComponents, ScoredRecord, ScoringQuery, age_hours, dedup_global,
    facet_bonus, recency_decay, rerank, score_batch, sort_by_score,
};
use crate::store::{StoreFilter, VectorStore};

/// How `retrieve` orders a conversation's records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Most recent turns first
    Episodic,
    /// Nearest neighbours of the query
    Semantic,
    /// Similarity blended with turn locality, freshness and facets
    #[default]
    Hybrid,
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMode::Episodic => write!(f, "episodic"),
            RetrievalMode::Semantic => write!(f, "semantic"),
            RetrievalMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for RetrievalMode {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "episodic" => Ok(RetrievalMode::Episodic),
            "semantic" => Ok(RetrievalMode::Semantic),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            other => Err(MnemoError::validation(format!(
                "unknown retrieval mode '{}'",
                other
            ))),
        }
    }
}

/// Optional restrictions on retrieved records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveFilters {
    pub speaker: Option<Speaker>,
    pub kind: Option<MemoryKind>,
    /// Minimum cosine similarity to the query; ignored without a query
    pub min_similarity: Option<f32>,
}

/// A retrieval request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub conversation_id: String,
    /// Number of results; the configured default when unset
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub mode: RetrievalMode,
    #[serde(default)]
    pub query: Option<String>,
    /// Facet kinds or values to favour in hybrid mode
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default)]
    pub filters: RetrieveFilters,
}

impl RetrieveRequest {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Default::default()
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_facets<S: Into<String>>(mut self, facets: impl IntoIterator<Item = S>) -> Self {
        self.facets = facets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filters(mut self, filters: RetrieveFilters) -> Self {
        self.filters = filters;
        self
    }

    fn query_text(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

/// Declarative forget request. Both parts may be combined; TTL runs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgetRequest {
    /// Remove records older than this many days
    pub ttl_days: Option<f64>,
    /// Keep at most this many records, evicting least recently used first
    pub keep_last_n: Option<usize>,
}

/// Aggregate stats for one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub total_turns: usize,
    pub episodic: usize,
    pub semantic: usize,
    pub speakers: Vec<Speaker>,
    pub distinct_speakers: usize,
    pub current_turn: u64,
}

/// Engine tuning
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
}

impl From<&MnemoConfig> for EngineConfig {
    fn from(config: &MnemoConfig) -> Self {
        Self {
            retrieval: config.retrieval.clone(),
        }
    }
}

/// Facade over the store, the forget policy and the embedding provider.
///
/// Tracks a per-conversation cursor (the highest ingested turn) in memory;
/// it is rebuilt from the store when the engine is created.
pub struct MemoryEngine {
    store: VectorStore,
    policy: ForgetPolicy,
    embedder: Arc<dyn EmbeddingProvider>,
    config: EngineConfig,
    cursors: HashMap<String, u64>,
}

impl fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("records", &self.store.len())
            .field("embedder", &self.embedder.name())
            .field("conversations", &self.cursors.len())
            .finish()
    }
}

impl MemoryEngine {
    pub fn new(
        store: VectorStore,
        mut policy: ForgetPolicy,
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Self {
        policy.reconcile(&store);

        let mut cursors: HashMap<String, u64> = HashMap::new();
        for record in store.records() {
            let cursor = cursors.entry(record.conversation_id.clone()).or_insert(0);
            *cursor = (*cursor).max(record.turn);
        }

        Self {
            store,
            policy,
            embedder,
            config,
            cursors,
        }
    }

    /// Build an engine from configuration, loading the store and its
    /// eviction index when a store path is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn open(config: &MnemoConfig) -> Result<Self> {
        config.validate()?;
        let embedder = EmbeddingProviderFactory::create(&config.embeddings)?;

        let (store, policy) = match &config.store.path {
            Some(path) => (
                VectorStore::open(path),
                ForgetPolicy::open(index_path_for(path), config.forget.clone()),
            ),
            None => (
                VectorStore::in_memory(),
                ForgetPolicy::in_memory(config.forget.clone()),
            ),
        };

        Ok(Self::new(store, policy, embedder, EngineConfig::from(config)))
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn policy(&self) -> &ForgetPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Highest ingested turn for a conversation
    pub fn current_turn(&self, conversation_id: &str) -> Option<u64> {
        self.cursors.get(conversation_id).copied()
    }

    /// Validate and store a record. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed records; nothing is stored in
    /// that case. Persistence failures are logged, not returned.
    pub fn ingest(&mut self, mut record: MemoryRecord) -> Result<String> {
        record.validate()?;

        let vector = match record.embedding.take() {
            Some(vector) => vector,
            None => self.embedder.embed(&record.text),
        };
        let id = record.id.clone();
        let conversation_id = record.conversation_id.clone();
        let turn = record.turn;
        let now = Utc::now();
        let ttl_days = self.policy.config().default_ttl_days;

        self.policy.register(&record, ttl_days, now);
        if let Err(e) = self.store.add(record, Some(vector)) {
            tracing::debug!(record_id = %id, error = %e, "Record kept in memory only");
        }

        let cursor = self.cursors.entry(conversation_id.clone()).or_insert(0);
        *cursor = (*cursor).max(turn);

        tracing::debug!(
            record_id = %id,
            conversation_id = %conversation_id,
            turn,
            "Ingested record"
        );

        let ceiling = self.policy.config().global_ceiling;
        if self.store.len() > ceiling {
            tracing::info!(
                records = self.store.len(),
                ceiling,
                "Store above ceiling, evicting"
            );
            self.policy.cleanup(&mut self.store, now);
            self.policy.enforce_global_cap(&mut self.store, ceiling);
            self.prune_cursors();
        }

        Ok(id)
    }

    /// Retrieve records for a conversation. Never fails; unknown
    /// conversations yield an empty list.
    pub fn retrieve(&mut self, request: &RetrieveRequest) -> Vec<MemoryRecord> {
        let k = request.k.unwrap_or(self.config.retrieval.default_k);
        if k == 0 || !self.cursors.contains_key(&request.conversation_id) {
            return Vec::new();
        }

        let now = Utc::now();
        let results = match (request.mode, request.query_text()) {
            (RetrievalMode::Episodic, _) | (_, None) => self.episodic(request, k),
            (RetrievalMode::Semantic, Some(query)) => self.semantic(request, query, k),
            (RetrievalMode::Hybrid, Some(query)) => self.hybrid(request, query, k, now),
        };

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        self.policy.touch_many(&ids, now);

        tracing::debug!(
            conversation_id = %request.conversation_id,
            mode = %request.mode,
            k,
            returned = results.len(),
            "Retrieved records"
        );
        results
    }

    /// Shorthand for [`retrieve`](Self::retrieve)
    pub fn retrieve_simple(
        &mut self,
        conversation_id: &str,
        k: usize,
        mode: RetrievalMode,
        query: Option<&str>,
    ) -> Vec<MemoryRecord> {
        let mut request = RetrieveRequest::new(conversation_id)
            .with_k(k)
            .with_mode(mode);
        request.query = query.map(str::to_string);
        self.retrieve(&request)
    }

    fn store_filter(request: &RetrieveRequest) -> StoreFilter {
        StoreFilter {
            conversation_id: Some(request.conversation_id.clone()),
            speaker: request.filters.speaker,
            kind: request.filters.kind,
            min_similarity: request.filters.min_similarity,
        }
    }

    fn episodic(&self, request: &RetrieveRequest, k: usize) -> Vec<MemoryRecord> {
        let mut records = self.store.list_all(&Self::store_filter(request));
        records.retain(pii::passes_gate);
        records.reverse();
        records.truncate(k);
        records
    }

    /// Gated nearest neighbours with their similarity, best first
    fn neighbours(&self, request: &RetrieveRequest, query: &str) -> Vec<(MemoryRecord, f32)> {
        let query_vector = self.embedder.embed(query);
        self.store
            .search(&query_vector, usize::MAX, &Self::store_filter(request))
            .into_iter()
            .filter(|(record, _)| pii::passes_gate(record))
            .collect()
    }

    fn semantic(&self, request: &RetrieveRequest, query: &str, k: usize) -> Vec<MemoryRecord> {
        self.neighbours(request, query)
            .into_iter()
            .take(k)
            .map(|(record, _)| record)
            .collect()
    }

    fn hybrid(
        &self,
        request: &RetrieveRequest,
        query: &str,
        k: usize,
        now: DateTime<Utc>,
    ) -> Vec<MemoryRecord> {
        let retrieval = &self.config.retrieval;
        let weights = retrieval.hybrid_weights.normalized();
        let current_turn = self.cursors.get(&request.conversation_id).copied().unwrap_or(0);
        let pool = k.saturating_mul(retrieval.candidate_multiplier);

        let mut scored: Vec<ScoredRecord> = self
            .neighbours(request, query)
            .into_iter()
            .take(pool)
            .map(|(record, similarity)| {
                let similarity = f64::from(similarity).max(0.0);
                let turn_recency = self.turn_recency(&record, current_turn);
                let time_recency =
                    recency_decay(age_hours(&record, now), retrieval.recency_half_life_hours);
                let facet = facet_bonus(&record.facets, &request.facets);

                let score = weights.similarity * similarity
                    + weights.turn_recency * turn_recency
                    + weights.time_recency * time_recency
                    + weights.facet * facet;

                ScoredRecord {
                    vector: self.store.vector(&record.id).map(<[f32]>::to_vec),
                    record,
                    score,
                    components: ScoreComponents {
                        lexical: 0.0,
                        cosine: similarity,
                        recency: turn_recency,
                        facet,
                    },
                }
            })
            .collect();

        sort_by_score(&mut scored);
        rerank(query, scored, &self.rerank_config())
            .into_iter()
            .take(k)
            .map(|s| s.record)
            .collect()
    }

    /// Locality around the cursor, `1 / (1 + decay·distance)` clamped to
    /// `[floor, 1]`. A record's own turn-distance hint wins over the cursor.
    fn turn_recency(&self, record: &MemoryRecord, current_turn: u64) -> f64 {
        let retrieval = &self.config.retrieval;
        let distance = record
            .turn_distance
            .map(u64::from)
            .unwrap_or_else(|| current_turn.abs_diff(record.turn));
        let boost = 1.0 / (1.0 + retrieval.turn_decay * distance as f64);
        boost.clamp(retrieval.turn_recency_floor, 1.0)
    }

    fn rerank_config(&self) -> RerankConfig {
        RerankConfig {
            top_k: self.config.retrieval.rerank_top_k,
            near_duplicate_threshold: self.config.retrieval.near_duplicate_threshold,
            ..Default::default()
        }
    }

    /// Multi-signal ranking of a conversation against a query: batch score,
    /// re-rank, collapse duplicates, keep `k`. Vectors are not returned.
    pub fn rank(
        &mut self,
        conversation_id: &str,
        query: &str,
        k: usize,
        facets: &[String],
    ) -> Vec<ScoredRecord> {
        if k == 0 || !self.cursors.contains_key(conversation_id) {
            return Vec::new();
        }

        let now = Utc::now();
        let retrieval = &self.config.retrieval;
        let candidates: Vec<Candidate> = self
            .store
            .list_all(&StoreFilter::conversation(conversation_id))
            .into_iter()
            .map(|record| Candidate {
                vector: self.store.vector(&record.id).map(<[f32]>::to_vec),
                record,
            })
            .collect();
        let scoring_query = ScoringQuery {
            text: query.to_string(),
            vector: Some(self.embedder.embed(query)),
            facets: facets.to_vec(),
        };

        let scored = score_batch(
            &scoring_query,
            candidates,
            &retrieval.ranking_weights,
            now,
            retrieval.recency_half_life_hours,
        );
        let reranked = rerank(query, scored, &self.rerank_config());
        let mut ranked = dedup_global(reranked, retrieval.dedup_threshold);
        ranked.truncate(k);
        for item in &mut ranked {
            item.vector = None;
        }

        let ids: Vec<&str> = ranked.iter().map(|s| s.record.id.as_str()).collect();
        self.policy.touch_many(&ids, now);

        tracing::debug!(
            conversation_id = %conversation_id,
            returned = ranked.len(),
            "Ranked records"
        );
        ranked
    }

    /// Apply a forget request to one conversation. Returns how many records
    /// were removed.
    pub fn forget(&mut self, conversation_id: &str, request: &ForgetRequest) -> usize {
        let mut removed = 0;
        if let Some(ttl_days) = request.ttl_days {
            removed += self.policy.expire_conversation(
                &mut self.store,
                conversation_id,
                ttl_days,
                Utc::now(),
            );
        }
        if let Some(keep) = request.keep_last_n {
            removed += self.policy.enforce_cap(&mut self.store, conversation_id, keep);
        }
        if removed > 0 {
            self.prune_cursors();
        }

        tracing::debug!(conversation_id = %conversation_id, removed, "Forget request applied");
        removed
    }

    /// Stats for one conversation. Counts include records hidden by the PII
    /// gate.
    pub fn snapshot(&self, conversation_id: &str) -> ConversationSnapshot {
        let records = self
            .store
            .list_all(&StoreFilter::conversation(conversation_id));
        let speakers: BTreeSet<Speaker> = records.iter().map(|r| r.speaker).collect();
        let semantic = records
            .iter()
            .filter(|r| r.kind == MemoryKind::Semantic)
            .count();

        ConversationSnapshot {
            conversation_id: conversation_id.to_string(),
            total_turns: records.len(),
            episodic: records.len() - semantic,
            semantic,
            distinct_speakers: speakers.len(),
            speakers: speakers.into_iter().collect(),
            current_turn: self.current_turn(conversation_id).unwrap_or(0),
        }
    }

    /// Run expiry and per-conversation caps across the store
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> CleanupReport {
        let report = self.policy.cleanup(&mut self.store, now);
        if report.total_evicted > 0 {
            self.prune_cursors();
        }
        report
    }

    /// Drop cursors of conversations that no longer hold any record
    fn prune_cursors(&mut self) {
        let live = self.store.conversations();
        self.cursors.retain(|conversation_id, _| live.contains(conversation_id));
    }

    /// Mark a record as recently used
    pub fn touch(&mut self, id: &str) {
        self.policy.touch(id, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgetConfig;
    use crate::embeddings::LexicalEmbeddings;
    use crate::forget::RecordState;

    fn engine() -> MemoryEngine {
        MemoryEngine::new(
            VectorStore::in_memory(),
            ForgetPolicy::in_memory(ForgetConfig::default()),
            Arc::new(LexicalEmbeddings::default()),
            EngineConfig::default(),
        )
    }

    fn turn(conv: &str, turn: u64, text: &str) -> MemoryRecord {
        MemoryRecord::builder(conv, turn, Speaker::User, text)
            .id(format!("{conv}-{turn}"))
            .pii_masked(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Hybrid".parse::<RetrievalMode>().unwrap(), RetrievalMode::Hybrid);
        assert_eq!("episodic".parse::<RetrievalMode>().unwrap(), RetrievalMode::Episodic);
        assert!("fuzzy".parse::<RetrievalMode>().is_err());
        assert_eq!(RetrievalMode::default(), RetrievalMode::Hybrid);
    }

    #[test]
    fn test_ingest_rejects_invalid_record() {
        let mut engine = engine();
        let mut record = turn("c1", 1, "hello");
        record.text = "  ".to_string();

        let err = engine.ingest(record).unwrap_err();
        assert!(err.is_validation());
        assert!(engine.is_empty());
        assert_eq!(engine.current_turn("c1"), None);
    }

    #[test]
    fn test_ingest_computes_vector_and_cursor() {
        let mut engine = engine();
        engine.ingest(turn("c1", 3, "first")).unwrap();
        engine.ingest(turn("c1", 1, "late arrival")).unwrap();

        assert_eq!(engine.current_turn("c1"), Some(3));
        assert_eq!(engine.store().vector("c1-3").map(<[f32]>::len), Some(64));
        assert_eq!(engine.policy().len(), 2);
    }

    #[test]
    fn test_episodic_order() {
        let mut engine = engine();
        for t in 1..=5 {
            engine.ingest(turn("c1", t, &format!("message number {t}"))).unwrap();
        }

        let turns: Vec<u64> = engine
            .retrieve_simple("c1", 3, RetrievalMode::Episodic, None)
            .iter()
            .map(|r| r.turn)
            .collect();
        assert_eq!(turns, vec![5, 4, 3]);
    }

    #[test]
    fn test_query_less_modes_fall_back_to_episodic() {
        let mut engine = engine();
        for t in 1..=4 {
            engine.ingest(turn("c1", t, &format!("line {t}"))).unwrap();
        }

        for mode in [RetrievalMode::Semantic, RetrievalMode::Hybrid] {
            let turns: Vec<u64> = engine
                .retrieve_simple("c1", 2, mode, Some("   "))
                .iter()
                .map(|r| r.turn)
                .collect();
            assert_eq!(turns, vec![4, 3]);
        }
    }

    #[test]
    fn test_unknown_conversation_is_empty() {
        let mut engine = engine();
        assert!(engine.retrieve(&RetrieveRequest::new("nobody").with_query("x")).is_empty());
        assert_eq!(engine.snapshot("nobody"), ConversationSnapshot {
            conversation_id: "nobody".into(),
            ..Default::default()
        });
    }

    #[test]
    fn test_semantic_prefers_matching_text() {
        let mut engine = MemoryEngine::new(
            VectorStore::in_memory(),
            ForgetPolicy::in_memory(ForgetConfig::default()),
            Arc::new(crate::embeddings::HashedEmbeddings::new(256)),
            EngineConfig::default(),
        );
        engine.ingest(turn("c1", 1, "we booked the train to Porto")).unwrap();
        engine.ingest(turn("c1", 2, "the cat knocked over a plant")).unwrap();

        let results =
            engine.retrieve_simple("c1", 1, RetrievalMode::Semantic, Some("train to Porto"));
        assert_eq!(results[0].id, "c1-1");
        assert!(results[0].embedding.is_none());
    }

    #[test]
    fn test_filters_apply() {
        let mut engine = engine();
        engine.ingest(turn("c1", 1, "user line")).unwrap();
        engine
            .ingest(
                MemoryRecord::builder("c1", 2, Speaker::Partner, "partner line")
                    .id("p")
                    .pii_masked(true)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let request = RetrieveRequest::new("c1")
            .with_mode(RetrievalMode::Episodic)
            .with_filters(RetrieveFilters {
                speaker: Some(Speaker::Partner),
                ..Default::default()
            });
        let results = engine.retrieve(&request);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p");
    }

    #[test]
    fn test_turn_recency_clamped() {
        let engine = engine();
        let near = turn("c1", 10, "x");
        let far = turn("c1", 1, "x");
        assert_eq!(engine.turn_recency(&near, 10), 1.0);
        assert_eq!(engine.turn_recency(&far, 1000), 0.2);

        let mut hinted = turn("c1", 1, "x");
        hinted.turn_distance = Some(0);
        assert_eq!(engine.turn_recency(&hinted, 1000), 1.0);
    }

    #[test]
    fn test_forget_keep_last_n_and_snapshot() {
        let mut engine = engine();
        for t in 1..=10 {
            engine.ingest(turn("c1", t, &format!("turn {t} text"))).unwrap();
        }

        let removed = engine.forget("c1", &ForgetRequest {
            keep_last_n: Some(5),
            ..Default::default()
        });
        assert_eq!(removed, 5);

        let snapshot = engine.snapshot("c1");
        assert_eq!(snapshot.total_turns, 5);
        assert_eq!(snapshot.current_turn, 10);
        assert_eq!(snapshot.distinct_speakers, 1);
        assert_eq!(engine.policy().state_of("c1-1", Utc::now()), Some(RecordState::Evicted));
    }

    #[test]
    fn test_emptied_conversation_drops_cursor() {
        let mut engine = engine();
        engine.ingest(turn("c1", 4, "only turn")).unwrap();
        engine.ingest(turn("c2", 1, "other chat")).unwrap();

        let request = ForgetRequest {
            keep_last_n: Some(0),
            ..Default::default()
        };
        assert_eq!(engine.forget("c1", &request), 1);

        assert_eq!(engine.current_turn("c1"), None);
        assert_eq!(engine.current_turn("c2"), Some(1));
        assert_eq!(engine.snapshot("c1").current_turn, 0);
        assert!(engine.retrieve_simple("c1", 5, RetrievalMode::Episodic, None).is_empty());
    }

    #[test]
    fn test_global_ceiling_on_ingest() {
        let config = ForgetConfig {
            global_ceiling: 3,
            ..Default::default()
        };
        let mut engine = MemoryEngine::new(
            VectorStore::in_memory(),
            ForgetPolicy::in_memory(config),
            Arc::new(LexicalEmbeddings::default()),
            EngineConfig::default(),
        );
        for t in 1..=5 {
            engine.ingest(turn("c1", t, &format!("entry {t}"))).unwrap();
        }
        assert!(engine.len() <= 3);
        assert!(engine.store().contains("c1-5"));
    }

    #[test]
    fn test_rank_dedups_and_strips_vectors() {
        let mut engine = engine();
        engine.ingest(turn("c1", 1, "we agreed to meet at the station")).unwrap();
        engine.ingest(turn("c1", 2, "We agreed to meet at the station!")).unwrap();
        engine.ingest(turn("c1", 3, "dinner was lovely")).unwrap();

        let ranked = engine.rank("c1", "meet at the station", 5, &[]);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|s| s.vector.is_none()));
        assert!(ranked.iter().any(|s| s.record.id == "c1-3"));
    }
}
