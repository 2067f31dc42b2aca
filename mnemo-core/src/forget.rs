//! TTL expiry and LRU caps over the vector store.
//!
//! The policy keeps an eviction index beside the store: one entry per record
//! with its TTL and last access time. Records move `Active → Expired →
//! Removed` when their age passes the TTL, or `Active → Evicted → Removed`
//! when a cap pushes them out. The index is persisted as its own JSON
//! document so access times survive restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::config::ForgetConfig;
use crate::persist::{self, LoadOutcome};
use crate::record::MemoryRecord;
use crate::store::{StoreFilter, VectorStore};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// How many removed or evicted ids keep a queryable terminal state
const RETIRED_CAPACITY: usize = 1024;

/// Lifecycle state of a record known to the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Active,
    /// Older than its TTL, removed on the next expiry pass
    Expired,
    /// Pushed out by a cap
    Evicted,
    Removed,
}

/// Index entry for one stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionEntry {
    pub record_id: String,
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub turn: u64,
    pub ttl_days: f64,
    pub last_access: DateTime<Utc>,
}

impl EvictionEntry {
    fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age_days(now) > self.ttl_days
    }
}

/// Outcome of a cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub ttl_evicted: usize,
    pub lru_evicted: usize,
    pub total_evicted: usize,
    pub remaining: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    entries: Vec<EvictionEntry>,
}

/// Sidecar index location for a store file: `<store>.evict.json`
pub fn index_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".evict.json");
    store_path.with_file_name(name)
}

/// TTL and LRU policy with its eviction index
#[derive(Debug)]
pub struct ForgetPolicy {
    config: ForgetConfig,
    path: Option<PathBuf>,
    entries: HashMap<String, EvictionEntry>,
    retired: HashMap<String, RecordState>,
    retired_order: VecDeque<String>,
}

impl ForgetPolicy {
    /// Policy with an index that is never written to disk
    pub fn in_memory(config: ForgetConfig) -> Self {
        Self {
            config,
            path: None,
            entries: HashMap::new(),
            retired: HashMap::new(),
            retired_order: VecDeque::new(),
        }
    }

    /// Open the index at `path`. A missing or unreadable index starts empty and
    /// is rebuilt from the store on the next reconcile.
    pub fn open(path: impl Into<PathBuf>, config: ForgetConfig) -> Self {
        let path = path.into();
        let mut policy = Self {
            path: Some(path.clone()),
            ..Self::in_memory(config)
        };

        match persist::read_json::<IndexDocument>(&path) {
            LoadOutcome::Loaded(document) => {
                policy.entries = document
                    .entries
                    .into_iter()
                    .map(|e| (e.record_id.clone(), e))
                    .collect();
                tracing::debug!(
                    path = %path.display(),
                    entries = policy.entries.len(),
                    "Loaded eviction index"
                );
            }
            LoadOutcome::Missing => {}
            LoadOutcome::Corrupt(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Eviction index is unreadable, rebuilding from store"
                );
            }
        }

        policy
    }

    pub fn config(&self) -> &ForgetConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&EvictionEntry> {
        self.entries.get(id)
    }

    /// Add or refresh the index entry for a stored record
    pub fn register(&mut self, record: &MemoryRecord, ttl_days: f64, now: DateTime<Utc>) {
        self.insert_entry(record, ttl_days, now);
        self.save();
    }

    fn insert_entry(&mut self, record: &MemoryRecord, ttl_days: f64, last_access: DateTime<Utc>) {
        if self.retired.remove(&record.id).is_some() {
            self.retired_order.retain(|id| id != &record.id);
        }
        self.entries.insert(
            record.id.clone(),
            EvictionEntry {
                record_id: record.id.clone(),
                conversation_id: record.conversation_id.clone(),
                timestamp: record.timestamp,
                turn: record.turn,
                ttl_days,
                last_access,
            },
        );
    }

    /// Current state of a record. Terminal states are kept for the most
    /// recently retired ids only; older ones report `None`.
    pub fn state_of(&self, id: &str, now: DateTime<Utc>) -> Option<RecordState> {
        if let Some(entry) = self.entries.get(id) {
            return Some(if entry.is_expired(now) {
                RecordState::Expired
            } else {
                RecordState::Active
            });
        }
        self.retired.get(id).copied()
    }

    /// Record an access. Unknown ids are ignored.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.last_access = now;
            self.save();
        }
    }

    /// Record an access for several ids with a single index write
    pub fn touch_many<S: AsRef<str>>(&mut self, ids: &[S], now: DateTime<Utc>) {
        let mut touched = 0;
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id.as_ref()) {
                entry.last_access = now;
                touched += 1;
            }
        }
        if touched > 0 {
            self.save();
        }
    }

    /// Align the index with the store: drop entries for vanished records and
    /// register unindexed records with the default TTL, last accessed at their
    /// own timestamp.
    pub fn reconcile(&mut self, store: &VectorStore) {
        let before = self.entries.len();
        self.entries.retain(|id, _| store.contains(id));
        let dropped = before - self.entries.len();

        let missing: Vec<MemoryRecord> = store
            .records()
            .filter(|r| !self.entries.contains_key(&r.id))
            .cloned()
            .collect();
        let ttl = self.config.default_ttl_days;
        for record in &missing {
            self.insert_entry(record, ttl, record.timestamp);
        }

        if dropped > 0 || !missing.is_empty() {
            tracing::debug!(dropped, registered = missing.len(), "Reconciled eviction index");
            self.save();
        }
    }

    /// Remove every record older than its TTL. Returns how many were removed.
    pub fn forget_expired(&mut self, store: &mut VectorStore, now: DateTime<Utc>) -> usize {
        self.reconcile(store);
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.record_id.clone())
            .collect();
        self.remove(store, expired, RecordState::Removed)
    }

    /// Remove records of one conversation older than `ttl_days`
    pub fn expire_conversation(
        &mut self,
        store: &mut VectorStore,
        conversation_id: &str,
        ttl_days: f64,
        now: DateTime<Utc>,
    ) -> usize {
        self.reconcile(store);
        let expired: Vec<String> = store
            .list_all(&StoreFilter::conversation(conversation_id))
            .into_iter()
            .filter(|r| (now - r.timestamp).num_milliseconds() as f64 / MILLIS_PER_DAY > ttl_days)
            .map(|r| r.id)
            .collect();
        self.remove(store, expired, RecordState::Removed)
    }

    /// Evict least recently accessed records of a conversation until at most
    /// `cap` remain. Ties go to the older timestamp, then the lower turn.
    pub fn enforce_cap(
        &mut self,
        store: &mut VectorStore,
        conversation_id: &str,
        cap: usize,
    ) -> usize {
        self.reconcile(store);
        let candidates: Vec<&EvictionEntry> = self
            .entries
            .values()
            .filter(|e| e.conversation_id == conversation_id)
            .collect();
        let victims = lru_victims(candidates, cap);
        self.remove(store, victims, RecordState::Evicted)
    }

    /// Evict least recently accessed records across the store until at most
    /// `ceiling` remain.
    pub fn enforce_global_cap(&mut self, store: &mut VectorStore, ceiling: usize) -> usize {
        self.reconcile(store);
        let victims = lru_victims(self.entries.values().collect(), ceiling);
        self.remove(store, victims, RecordState::Evicted)
    }

    /// Reconcile, expire, then apply the per-conversation cap everywhere
    pub fn cleanup(&mut self, store: &mut VectorStore, now: DateTime<Utc>) -> CleanupReport {
        let ttl_evicted = self.forget_expired(store, now);

        let cap = self.config.per_conversation_cap;
        let conversations = store.conversations();
        let lru_evicted: usize = conversations
            .iter()
            .map(|conversation_id| self.enforce_cap(store, conversation_id, cap))
            .sum();

        let report = CleanupReport {
            ttl_evicted,
            lru_evicted,
            total_evicted: ttl_evicted + lru_evicted,
            remaining: store.len(),
        };
        tracing::info!(
            ttl_evicted = report.ttl_evicted,
            lru_evicted = report.lru_evicted,
            remaining = report.remaining,
            "Cleanup finished"
        );
        report
    }

    fn remove(
        &mut self,
        store: &mut VectorStore,
        ids: Vec<String>,
        terminal: RecordState,
    ) -> usize {
        if ids.is_empty() {
            return 0;
        }

        let present: Vec<String> = ids.into_iter().filter(|id| store.contains(id)).collect();
        if let Err(e) = store.remove_many(&present) {
            tracing::debug!(error = %e, "Store write failed after eviction, kept in memory");
        }
        for id in &present {
            self.entries.remove(id);
            self.retire(id, terminal);
        }

        tracing::debug!(removed = present.len(), state = ?terminal, "Forgot records");
        self.save();
        present.len()
    }

    fn retire(&mut self, id: &str, state: RecordState) {
        if self.retired.insert(id.to_string(), state).is_none() {
            self.retired_order.push_back(id.to_string());
        }
        while self.retired_order.len() > RETIRED_CAPACITY {
            if let Some(oldest) = self.retired_order.pop_front() {
                self.retired.remove(&oldest);
            }
        }
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let mut entries: Vec<EvictionEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.record_id.cmp(&b.record_id));
        if let Err(e) = persist::write_json_atomic(path, &IndexDocument { entries }) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist eviction index");
        }
    }
}

fn lru_victims(mut candidates: Vec<&EvictionEntry>, keep: usize) -> Vec<String> {
    if candidates.len() <= keep {
        return Vec::new();
    }
    candidates.sort_by(|a, b| {
        a.last_access
            .cmp(&b.last_access)
            .then(a.timestamp.cmp(&b.timestamp))
            .then(a.turn.cmp(&b.turn))
            .then(a.record_id.cmp(&b.record_id))
    });
    let excess = candidates.len() - keep;
    candidates
        .into_iter()
        .take(excess)
        .map(|e| e.record_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Speaker;
    use chrono::Duration;
    use tempfile::TempDir;

    fn record(conv: &str, turn: u64, ts: DateTime<Utc>) -> MemoryRecord {
        MemoryRecord::builder(conv, turn, Speaker::User, format!("turn {turn}"))
            .id(format!("{conv}-{turn}"))
            .pii_masked(true)
            .timestamp(ts)
            .build()
            .unwrap()
    }

    fn setup(records: &[MemoryRecord], now: DateTime<Utc>) -> (VectorStore, ForgetPolicy) {
        let mut store = VectorStore::in_memory();
        let mut policy = ForgetPolicy::in_memory(ForgetConfig::default());
        for r in records {
            store.add(r.clone(), None).unwrap();
            policy.register(r, 30.0, now);
        }
        (store, policy)
    }

    #[test]
    fn test_index_path() {
        assert_eq!(
            index_path_for(Path::new("/data/store.json")),
            PathBuf::from("/data/store.json.evict.json")
        );
    }

    #[test]
    fn test_forget_expired_is_idempotent() {
        let now = Utc::now();
        let old = record("c", 1, now - Duration::days(40));
        let fresh = record("c", 2, now - Duration::days(1));
        let (mut store, mut policy) = setup(&[old.clone(), fresh.clone()], now);

        assert_eq!(policy.state_of(&old.id, now), Some(RecordState::Expired));
        assert_eq!(policy.forget_expired(&mut store, now), 1);
        assert_eq!(policy.forget_expired(&mut store, now), 0);
        assert!(!store.contains(&old.id));
        assert!(store.contains(&fresh.id));
        assert_eq!(policy.state_of(&old.id, now), Some(RecordState::Removed));
        assert_eq!(policy.state_of(&fresh.id, now), Some(RecordState::Active));
    }

    #[test]
    fn test_enforce_cap_evicts_least_recent() {
        let now = Utc::now();
        let records: Vec<_> = (1..=5).map(|t| record("c", t, now)).collect();
        let (mut store, mut policy) = setup(&records, now);

        // turn 1 was read recently, so turn 2 is now least recently used
        policy.touch("c-1", now + Duration::minutes(5));

        assert_eq!(policy.enforce_cap(&mut store, "c", 3), 2);
        assert_eq!(store.len(), 3);
        assert!(store.contains("c-1"));
        assert!(!store.contains("c-2"));
        assert!(!store.contains("c-3"));
        assert_eq!(policy.state_of("c-2", now), Some(RecordState::Evicted));
        assert_eq!(policy.enforce_cap(&mut store, "c", 3), 0);
    }

    #[test]
    fn test_cap_only_touches_its_conversation() {
        let now = Utc::now();
        let mut records: Vec<_> = (1..=3).map(|t| record("a", t, now)).collect();
        records.extend((1..=3).map(|t| record("b", t, now)));
        let (mut store, mut policy) = setup(&records, now);

        assert_eq!(policy.enforce_cap(&mut store, "a", 1), 2);
        assert_eq!(store.count(&StoreFilter::conversation("a")), 1);
        assert_eq!(store.count(&StoreFilter::conversation("b")), 3);
    }

    #[test]
    fn test_global_cap() {
        let now = Utc::now();
        let records: Vec<_> = (1..=6)
            .map(|t| record(if t % 2 == 0 { "a" } else { "b" }, t, now))
            .collect();
        let (mut store, mut policy) = setup(&records, now);

        assert_eq!(policy.enforce_global_cap(&mut store, 4), 2);
        assert_eq!(store.len(), 4);
        assert!(!store.contains("b-1"));
        assert!(!store.contains("a-2"));
    }

    #[test]
    fn test_expire_conversation() {
        let now = Utc::now();
        let (mut store, mut policy) = setup(
            &[
                record("a", 1, now - Duration::days(3)),
                record("a", 2, now),
                record("b", 1, now - Duration::days(3)),
            ],
            now,
        );

        assert_eq!(policy.expire_conversation(&mut store, "a", 1.0, now), 1);
        assert!(!store.contains("a-1"));
        assert!(store.contains("b-1"));
    }

    #[test]
    fn test_cleanup_report() {
        let now = Utc::now();
        let config = ForgetConfig {
            per_conversation_cap: 2,
            ..Default::default()
        };

        let mut store = VectorStore::in_memory();
        let mut policy = ForgetPolicy::in_memory(config);
        let mut records = vec![record("a", 1, now - Duration::days(45))];
        records.extend((2..=5).map(|t| record("a", t, now)));
        for r in &records {
            store.add(r.clone(), None).unwrap();
            policy.register(r, 30.0, now);
        }

        let report = policy.cleanup(&mut store, now);
        assert_eq!(report.ttl_evicted, 1);
        assert_eq!(report.lru_evicted, 2);
        assert_eq!(report.total_evicted, 3);
        assert_eq!(report.remaining, 2);
    }

    #[test]
    fn test_reconcile_registers_unindexed_records() {
        let now = Utc::now();
        let mut store = VectorStore::in_memory();
        store.add(record("c", 1, now - Duration::days(60)), None).unwrap();
        let mut policy = ForgetPolicy::in_memory(ForgetConfig::default());

        policy.reconcile(&store);
        assert_eq!(policy.len(), 1);
        assert_eq!(policy.forget_expired(&mut store, now), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_retired_states_stay_bounded() {
        let now = Utc::now();
        let mut store = VectorStore::in_memory();
        let mut policy = ForgetPolicy::in_memory(ForgetConfig::default());

        for turn in 0..(RETIRED_CAPACITY as u64 * 3) {
            let r = record("c", turn, now);
            store.add(r.clone(), None).unwrap();
            policy.register(&r, 30.0, now);
            policy.enforce_global_cap(&mut store, 10);
        }

        assert_eq!(store.len(), 10);
        assert_eq!(policy.len(), 10);
        assert_eq!(policy.retired.len(), RETIRED_CAPACITY);
        assert_eq!(policy.retired_order.len(), RETIRED_CAPACITY);
        let last_evicted = format!("c-{}", RETIRED_CAPACITY as u64 * 3 - 11);
        assert_eq!(policy.state_of(&last_evicted, now), Some(RecordState::Evicted));
        assert_eq!(policy.state_of("c-0", now), None);
    }

    #[test]
    fn test_reregistered_id_leaves_retired_set() {
        let now = Utc::now();
        let r = record("c", 1, now);
        let (mut store, mut policy) = setup(std::slice::from_ref(&r), now);

        policy.enforce_cap(&mut store, "c", 0);
        assert_eq!(policy.state_of(&r.id, now), Some(RecordState::Evicted));

        store.add(r.clone(), None).unwrap();
        policy.register(&r, 30.0, now);
        assert_eq!(policy.state_of(&r.id, now), Some(RecordState::Active));
        assert!(policy.retired_order.is_empty());
    }

    #[test]
    fn test_index_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json.evict.json");
        let now = Utc::now();
        let r = record("c", 1, now);

        {
            let mut policy = ForgetPolicy::open(&path, ForgetConfig::default());
            policy.register(&r, 7.0, now);
            policy.touch(&r.id, now + Duration::hours(1));
        }

        let policy = ForgetPolicy::open(&path, ForgetConfig::default());
        let entry = policy.entry(&r.id).unwrap();
        assert_eq!(entry.ttl_days, 7.0);
        assert_eq!(entry.last_access, now + Duration::hours(1));
    }
}
