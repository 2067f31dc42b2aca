//! Keyed record + vector store with atomic JSON persistence

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::persist::{self, LoadOutcome};
use crate::record::{MemoryKind, MemoryRecord, Speaker};
use crate::scoring::cosine_similarity;

/// Restricts store queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreFilter {
    pub conversation_id: Option<String>,
    pub speaker: Option<Speaker>,
    pub kind: Option<MemoryKind>,
    /// Only applied by [`VectorStore::search`]
    pub min_similarity: Option<f32>,
}

impl StoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            ..Default::default()
        }
    }

    pub fn with_speaker(mut self, speaker: Speaker) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_min_similarity(mut self, min: f32) -> Self {
        self.min_similarity = Some(min);
        self
    }

    fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(conv) = &self.conversation_id {
            if &record.conversation_id != conv {
                return false;
            }
        }
        if let Some(speaker) = self.speaker {
            if record.speaker != speaker {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
struct StoreEntry {
    record: MemoryRecord,
    vector: Option<Vec<f32>>,
}

/// On-disk layout: `records` and `vectors` keyed by id, plus insertion order
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    records: HashMap<String, MemoryRecord>,
    #[serde(default)]
    vectors: HashMap<String, Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    order: Vec<String>,
}

/// Persisted collection of records and their vectors.
///
/// Every mutating call rewrites the backing file atomically. In-memory state
/// is updated first, so a failed write leaves the store usable and returns the
/// error for the caller to log.
#[derive(Debug, Default)]
pub struct VectorStore {
    path: Option<PathBuf>,
    entries: HashMap<String, StoreEntry>,
    order: Vec<String>,
}

impl VectorStore {
    /// Store with no backing file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or invalid file is
    /// logged and also yields an empty store; it is overwritten on the next
    /// successful write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            ..Default::default()
        };

        match persist::read_json::<StoreDocument>(&path) {
            LoadOutcome::Loaded(document) => {
                store.load_document(document);
                tracing::info!(
                    path = %path.display(),
                    records = store.len(),
                    "Loaded memory store"
                );
            }
            LoadOutcome::Missing => {
                tracing::debug!(path = %path.display(), "No store file yet, starting empty");
            }
            LoadOutcome::Corrupt(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Store file is unreadable, starting empty"
                );
            }
        }

        store
    }

    fn load_document(&mut self, mut document: StoreDocument) {
        let mut order: Vec<String> = document
            .order
            .iter()
            .filter(|id| document.records.contains_key(*id))
            .cloned()
            .collect();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        order.retain(|id| seen.insert(id.clone()));

        // Records missing from `order` go after it, oldest first
        let mut rest: Vec<&MemoryRecord> = document
            .records
            .values()
            .filter(|r| !seen.contains(&r.id))
            .collect();
        rest.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.turn.cmp(&b.turn))
                .then(a.id.cmp(&b.id))
        });
        order.extend(rest.into_iter().map(|r| r.id.clone()));

        for id in &order {
            if let Some(mut record) = document.records.remove(id) {
                if record.id != *id {
                    tracing::warn!(
                        key = %id,
                        record_id = %record.id,
                        "Record key mismatch, using key"
                    );
                    record.id = id.clone();
                }
                let vector = document.vectors.remove(id);
                record.embedding = None;
                self.entries.insert(id.clone(), StoreEntry { record, vector });
            }
        }
        self.order = order;
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or replace a record. A replaced id keeps its insertion position.
    ///
    /// When `vector` is `None` the record's own embedding (if any) is kept as
    /// its vector. Records are stored without the embedding field.
    pub fn add(&mut self, mut record: MemoryRecord, vector: Option<Vec<f32>>) -> Result<()> {
        let vector = vector.or_else(|| record.embedding.take());
        record.embedding = None;
        let id = record.id.clone();

        if self
            .entries
            .insert(id.clone(), StoreEntry { record, vector })
            .is_none()
        {
            self.order.push(id.clone());
        }

        tracing::debug!(record_id = %id, "Stored record");
        self.flush()
    }

    pub fn get(&self, id: &str) -> Option<&MemoryRecord> {
        self.entries.get(id).map(|e| &e.record)
    }

    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.entries.get(id).and_then(|e| e.vector.as_deref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        if self.entries.remove(id).is_none() {
            return Ok(false);
        }
        self.order.retain(|o| o != id);
        tracing::debug!(record_id = %id, "Removed record");
        self.flush()?;
        Ok(true)
    }

    /// Remove several records with a single write. Returns how many existed.
    pub fn remove_many<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.entries.remove(id.as_ref()).is_some() {
                removed += 1;
            }
        }
        if removed == 0 {
            return Ok(0);
        }
        let entries = &self.entries;
        self.order.retain(|o| entries.contains_key(o));
        self.flush()?;
        Ok(removed)
    }

    /// Rank records by cosine similarity to `query`.
    ///
    /// Highest similarity first; ties keep insertion order. Records without a
    /// vector score 0.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: &StoreFilter,
    ) -> Vec<(MemoryRecord, f32)> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &StoreEntry, f32)> = self
            .iter_entries()
            .enumerate()
            .filter(|(_, e)| filter.matches(&e.record))
            .map(|(pos, e)| {
                let sim = e
                    .vector
                    .as_deref()
                    .map(|v| cosine_similarity(query, v))
                    .unwrap_or(0.0);
                (pos, e, sim)
            })
            .filter(|(_, _, sim)| filter.min_similarity.is_none_or(|min| *sim >= min))
            .collect();

        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(_, e, sim)| (e.record.clone(), sim))
            .collect()
    }

    /// Number of records matching `filter`
    pub fn count(&self, filter: &StoreFilter) -> usize {
        self.iter_entries()
            .filter(|e| filter.matches(&e.record))
            .count()
    }

    /// Records matching `filter`, by turn ascending (ties in insertion order)
    pub fn list_all(&self, filter: &StoreFilter) -> Vec<MemoryRecord> {
        let mut records: Vec<MemoryRecord> = self
            .iter_entries()
            .filter(|e| filter.matches(&e.record))
            .map(|e| e.record.clone())
            .collect();
        records.sort_by_key(|r| r.turn);
        records
    }

    /// Records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.iter_entries().map(|e| &e.record)
    }

    /// Distinct conversation ids
    pub fn conversations(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|e| e.record.conversation_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the current state to the backing file, if there is one.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut document = StoreDocument {
            order: self.order.clone(),
            ..Default::default()
        };
        for (id, entry) in &self.entries {
            document.records.insert(id.clone(), entry.record.clone());
            if let Some(vector) = &entry.vector {
                document.vectors.insert(id.clone(), vector.clone());
            }
        }

        persist::write_json_atomic(path, &document).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist store");
        })
    }

    fn iter_entries(&self) -> impl Iterator<Item = &StoreEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }
}
