//! Snapshot store: holds the one published [`Snapshot`].
//!
//! Publication is a single pointer replacement through [`ArcSwap`], so a
//! reader either sees the whole previous generation or the whole new one.
//! Readers keep their `Arc<Snapshot>` for as long as they need it; an old
//! generation is freed once its last reader lets go.

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{RuleDocument, Snapshot};

pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// The currently published snapshot.
    pub fn read(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Publishes a fully built mapping as the next generation and returns it.
    ///
    /// Callers must serialise swaps (the synchroniser does); the generation
    /// is derived from the snapshot being replaced.
    pub fn swap(&self, documents: BTreeMap<String, RuleDocument>) -> Arc<Snapshot> {
        let next = Arc::new(Snapshot::new(self.read().generation() + 1, documents));
        self.current.store(Arc::clone(&next));
        next
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> RuleDocument {
        RuleDocument {
            name: name.to_string(),
            title: name.to_string(),
            body: String::new(),
            fingerprint: None,
        }
    }

    #[test]
    fn starts_empty_at_generation_zero() {
        let store = SnapshotStore::new();
        let snap = store.read();
        assert_eq!(snap.generation(), 0);
        assert!(snap.is_empty());
    }

    #[test]
    fn swap_replaces_whole_mapping() {
        let store = SnapshotStore::new();
        let before = store.read();

        let mut docs = BTreeMap::new();
        docs.insert("a.md".to_string(), doc("a.md"));
        let published = store.swap(docs);

        assert_eq!(published.generation(), 1);
        assert!(Arc::ptr_eq(&published, &store.read()));
        // Readers holding the old generation are unaffected.
        assert!(before.is_empty());
        assert!(store.read().contains("a.md"));

        let after = store.swap(BTreeMap::new());
        assert_eq!(after.generation(), 2);
        assert!(!store.read().contains("a.md"));
    }
}
