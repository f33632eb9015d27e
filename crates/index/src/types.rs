//! Index domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar metadata value attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Option<String>> for MetadataValue {
    fn from(value: Option<String>) -> Self {
        value.map(Self::Text).unwrap_or(Self::Null)
    }
}

/// A document owned by the document store.
///
/// The similarity index only ever sees `id` and `embedding`; everything else
/// lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    /// Text that gets embedded
    pub text: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,

    /// Not written to the lookup table; rehydrated from the index snapshot on load.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,

    /// When the current embedding was computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
            embedding: None,
            indexed_at: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetadataValue::as_str)
    }

    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(MetadataValue::as_f64)
    }
}

/// Per-document result of a build or update.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutcome {
    pub id: String,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    /// Embedded and inserted (or refreshed) in the similarity index
    Indexed,
    /// Same id and text as the stored copy; only metadata was replaced
    MetadataOnly,
    /// Skipped; the stored copy (if any) is untouched
    Failed(String),
}

/// Outcome list returned by `build` and `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub outcomes: Vec<DocumentOutcome>,

    /// Whether the update triggered a flush to disk
    pub persisted: bool,

    /// Set when a flush failed; the changes stay in memory, still pending
    pub persist_error: Option<String>,
}

impl UpdateReport {
    pub fn indexed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Indexed))
    }

    pub fn metadata_only(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::MetadataOnly))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed(_)))
    }

    /// Ids and reasons of documents that could not be indexed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            OutcomeStatus::Failed(reason) => Some((o.id.as_str(), reason.as_str())),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Lifecycle of an index manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    /// In memory and on disk agree
    Loaded,
    /// In-memory changes not yet persisted
    Dirty,
    Persisting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loaded => "loaded",
            Self::Dirty => "dirty",
            Self::Persisting => "persisting",
        };
        f.write_str(s)
    }
}

/// Active similarity index variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Flat inner-product scan; true top-k
    #[default]
    Exact,
    /// Clustered (IVF) scan; best-effort top-k
    Approximate,
}

impl SearchStrategy {
    pub fn from_approximate(use_approximate: bool) -> Self {
        if use_approximate {
            Self::Approximate
        } else {
            Self::Exact
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Approximate => f.write_str("approximate"),
        }
    }
}

/// Snapshot of manager statistics.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub state: String,
    pub strategy: SearchStrategy,
    pub documents: usize,
    pub vectors: usize,
    pub dimension: usize,
    pub trained: bool,
    pub clusters: usize,
    pub pending_updates: usize,
    pub cache_entries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_persisted: Option<DateTime<Utc>>,
}
