//! Record model for stored dialogue turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MnemoError, Result};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Partner,
    System,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Partner => write!(f, "partner"),
            Speaker::System => write!(f, "system"),
        }
    }
}

/// Memory kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// A dialogue turn as it happened
    #[default]
    Episodic,
    /// A distilled fact about the conversation
    Semantic,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Episodic => write!(f, "episodic"),
            MemoryKind::Semantic => write!(f, "semantic"),
        }
    }
}

/// Facet category supplied by an external classifier.
///
/// Unknown names round-trip through `Custom`, so a new classifier can emit a
/// new kind without touching stored data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FacetKind {
    Topic,
    Intent,
    Entity,
    Affect,
    Custom(String),
}

impl FacetKind {
    pub fn as_str(&self) -> &str {
        match self {
            FacetKind::Topic => "topic",
            FacetKind::Intent => "intent",
            FacetKind::Entity => "entity",
            FacetKind::Affect => "affect",
            FacetKind::Custom(name) => name,
        }
    }
}

impl From<String> for FacetKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "topic" | "topics" => FacetKind::Topic,
            "intent" | "intents" => FacetKind::Intent,
            "entity" | "entities" => FacetKind::Entity,
            "affect" | "emotion" => FacetKind::Affect,
            _ => FacetKind::Custom(s),
        }
    }
}

impl From<&str> for FacetKind {
    fn from(s: &str) -> Self {
        FacetKind::from(s.to_string())
    }
}

impl From<FacetKind> for String {
    fn from(kind: FacetKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged facets attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Facets(BTreeMap<FacetKind, Vec<String>>);

// Spellings of one kind ("topic", "topics") merge into a single tag list
impl<'de> Deserialize<'de> for Facets {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        let mut facets = Facets::new();
        for (name, tags) in raw {
            let merged = facets.0.entry(FacetKind::from(name)).or_default();
            for tag in tags {
                if !merged.contains(&tag) {
                    merged.push(tag);
                }
            }
        }
        Ok(facets)
    }
}

impl Facets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag under a kind (builder style)
    pub fn with(mut self, kind: impl Into<FacetKind>, tag: impl Into<String>) -> Self {
        self.insert(kind, tag);
        self
    }

    /// Add a tag under a kind, ignoring exact duplicates
    pub fn insert(&mut self, kind: impl Into<FacetKind>, tag: impl Into<String>) {
        let tag = tag.into();
        let tags = self.0.entry(kind.into()).or_default();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    pub fn get(&self, kind: &FacetKind) -> Option<&[String]> {
        self.0.get(kind).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FacetKind, &Vec<String>)> {
        self.0.iter()
    }

    /// Whether `target` names a facet kind or any tag value (case-insensitive)
    pub fn matches(&self, target: &str) -> bool {
        let target = target.trim();
        if target.is_empty() {
            return false;
        }
        self.0.iter().any(|(kind, tags)| {
            kind.as_str().eq_ignore_ascii_case(target)
                || tags.iter().any(|t| t.trim().eq_ignore_ascii_case(target))
        })
    }
}

/// One stored memory unit: a dialogue turn or a distilled fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier
    pub id: String,

    /// Conversation this turn belongs to
    pub conversation_id: String,

    /// Turn number, monotonic per conversation
    pub turn: u64,

    pub speaker: Speaker,

    /// Turn text (never empty)
    pub text: String,

    #[serde(default, skip_serializing_if = "Facets::is_empty")]
    pub facets: Facets,

    pub timestamp: DateTime<Utc>,

    /// Whether PII has been masked upstream. Missing means unmasked.
    #[serde(default)]
    pub pii_masked: bool,

    #[serde(default)]
    pub kind: MemoryKind,

    /// Pre-computed embedding; the engine fills this in at ingest when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Distance in turns from the turn that produced this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_distance: Option<u32>,
}

impl MemoryRecord {
    /// Start building a record
    pub fn builder(
        conversation_id: impl Into<String>,
        turn: u64,
        speaker: Speaker,
        text: impl Into<String>,
    ) -> RecordBuilder {
        RecordBuilder::new(conversation_id, turn, speaker, text)
    }

    /// Parse and validate a record from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let record: MemoryRecord = serde_json::from_str(json)
            .map_err(|e| MnemoError::validation(format!("malformed record: {}", e)))?;
        record.validate()?;
        Ok(record)
    }

    /// Parse and validate a record from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let record: MemoryRecord = serde_json::from_value(value)
            .map_err(|e| MnemoError::validation(format!("malformed record: {}", e)))?;
        record.validate()?;
        Ok(record)
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(MnemoError::validation("record id is empty"));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(MnemoError::validation(format!(
                "record {} has an empty conversation id",
                self.id
            )));
        }
        if self.text.trim().is_empty() {
            return Err(MnemoError::validation(format!(
                "record {} has empty text",
                self.id
            )));
        }
        Ok(())
    }
}

/// Builder for [`MemoryRecord`]
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: MemoryRecord,
}

impl RecordBuilder {
    pub fn new(
        conversation_id: impl Into<String>,
        turn: u64,
        speaker: Speaker,
        text: impl Into<String>,
    ) -> Self {
        Self {
            record: MemoryRecord {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id: conversation_id.into(),
                turn,
                speaker,
                text: text.into(),
                facets: Facets::default(),
                timestamp: Utc::now(),
                pii_masked: false,
                kind: MemoryKind::Episodic,
                embedding: None,
                turn_distance: None,
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.record.id = id.into();
        self
    }

    pub fn facets(mut self, facets: Facets) -> Self {
        self.record.facets = facets;
        self
    }

    pub fn facet(mut self, kind: impl Into<FacetKind>, tag: impl Into<String>) -> Self {
        self.record.facets.insert(kind, tag);
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    pub fn pii_masked(mut self, masked: bool) -> Self {
        self.record.pii_masked = masked;
        self
    }

    pub fn kind(mut self, kind: MemoryKind) -> Self {
        self.record.kind = kind;
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.record.embedding = Some(embedding);
        self
    }

    pub fn turn_distance(mut self, distance: u32) -> Self {
        self.record.turn_distance = Some(distance);
        self
    }

    /// Validate and produce the record
    pub fn build(self) -> Result<MemoryRecord> {
        self.record.validate()?;
        Ok(self.record)
    }
}
