//! Read-only per-target knowledge injected into the dispatcher.
//!
//! The store is built once and shared as `Arc<dyn KnowledgeStore>`. The trait
//! exposes lookups only, so nothing reachable from the dispatcher can mutate it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Baseline knowledge about one target. `Default` is the "unknown target" value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Target identifier this record describes.
    pub target_id: String,
    /// Status code of the target's baseline response.
    pub baseline_status: u16,
    /// Body length of the baseline response.
    pub baseline_length: usize,
    /// Word count of the baseline response.
    pub baseline_words: usize,
    /// Line count of the baseline response.
    pub baseline_lines: usize,
    /// Parameters known to be reflected by the target.
    pub reflected: Vec<String>,
    /// Whether baseline responses were stable across repeated requests.
    pub stable: bool,
}

/// Lookup-only access to target knowledge.
pub trait KnowledgeStore: Send + Sync {
    /// Look up knowledge for a target.
    fn lookup(&self, target_id: &str) -> Option<&KnowledgeRecord>;

    /// Number of known targets.
    fn len(&self) -> usize;

    /// Whether no targets are known.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `HashMap`-backed knowledge, frozen at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledge {
    records: HashMap<String, KnowledgeRecord>,
}

impl StaticKnowledge {
    /// Freeze a map of target id to record.
    #[must_use]
    pub const fn new(records: HashMap<String, KnowledgeRecord>) -> Self {
        Self { records }
    }

    /// A store that knows no targets.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl KnowledgeStore for StaticKnowledge {
    fn lookup(&self, target_id: &str) -> Option<&KnowledgeRecord> {
        self.records.get(target_id)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl From<HashMap<String, KnowledgeRecord>> for StaticKnowledge {
    fn from(records: HashMap<String, KnowledgeRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<(String, KnowledgeRecord)> for StaticKnowledge {
    fn from_iter<I: IntoIterator<Item = (String, KnowledgeRecord)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Fetch knowledge for a target as `(record, found)`.
///
/// A miss is not an error: it yields the zero-value record and `false`.
#[must_use]
pub fn get_knowledge(store: &dyn KnowledgeStore, target_id: &str) -> (KnowledgeRecord, bool) {
    store
        .lookup(target_id)
        .map_or_else(|| (KnowledgeRecord::default(), false), |k| (k.clone(), true))
}
