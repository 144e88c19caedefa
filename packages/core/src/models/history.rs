//! Version Ledger
//!
//! Bounded, most-recent-first history of a document's prior states. One
//! ledger per document, owned exclusively by it and destroyed with it. The
//! ledger is only ever written through the document's update/restore path in
//! the workspace store.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::document::Snapshot;

/// Bounded history of [`Snapshot`]s, newest first.
///
/// Serializes transparently as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionLedger {
    snapshots: VecDeque<Snapshot>,
}

impl VersionLedger {
    /// Default retention bound per document.
    pub const DEFAULT_LIMIT: usize = 50;

    /// Prepend a snapshot, evicting the oldest entry beyond `limit`.
    pub fn push(&mut self, snapshot: Snapshot, limit: usize) {
        self.snapshots.push_front(snapshot);
        while self.snapshots.len() > limit {
            self.snapshots.pop_back();
        }
    }

    /// Prior states, newest first.
    pub fn list(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn snapshot(title: &str) -> Snapshot {
        Snapshot {
            title: title.to_string(),
            body: String::new(),
            tags: BTreeSet::new(),
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_push_is_newest_first() {
        let mut ledger = VersionLedger::default();
        ledger.push(snapshot("v1"), 50);
        ledger.push(snapshot("v2"), 50);

        let titles: Vec<_> = ledger.list().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["v2", "v1"]);
        assert_eq!(ledger.latest().unwrap().title, "v2");
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let mut ledger = VersionLedger::default();
        for i in 0..(VersionLedger::DEFAULT_LIMIT + 7) {
            ledger.push(snapshot(&format!("v{}", i)), VersionLedger::DEFAULT_LIMIT);
        }

        assert_eq!(ledger.len(), VersionLedger::DEFAULT_LIMIT);
        // The retained entries are the most recent ones; v0..v6 were evicted
        assert_eq!(ledger.latest().unwrap().title, "v56");
        let oldest = ledger.list().last().unwrap();
        assert_eq!(oldest.title, "v7");
    }

    #[test]
    fn test_transparent_serialization() {
        let mut ledger = VersionLedger::default();
        ledger.push(snapshot("v1"), 50);

        let json = serde_json::to_value(&ledger).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}
