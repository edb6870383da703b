//! Core data models shared by sources, the snapshot store and the resource
//! facade.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One rule document as served to clients.
///
/// Records are immutable: a refresh that includes the same name builds a
/// fresh record and the snapshot replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDocument {
    /// Source file name, unique within a snapshot (e.g. `"rust.md"`).
    pub name: String,
    /// First level-1 heading, or the name without its extension.
    pub title: String,
    /// Full UTF-8 body.
    pub body: String,
    /// Opaque content-version marker. `None` compares as "always changed".
    pub fingerprint: Option<String>,
}

/// A document as enumerated by a source, before its body is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    /// Version marker supplied by the source listing (the blob SHA for GitHub).
    pub fingerprint: Option<String>,
    /// Where to fetch the body from: a path or a download URL.
    pub location: String,
}

/// Result of enumerating a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// The source reported nothing changed since the previous listing.
    NotModified,
    /// Fresh enumeration, in source order.
    Entries(Vec<SourceEntry>),
}

/// Complete, internally consistent mapping from name to [`RuleDocument`]
/// at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    built_at: DateTime<Utc>,
    documents: BTreeMap<String, RuleDocument>,
}

impl Snapshot {
    /// The generation-zero snapshot every store starts with.
    pub fn empty() -> Self {
        Self::new(0, BTreeMap::new())
    }

    pub fn new(generation: u64, documents: BTreeMap<String, RuleDocument>) -> Self {
        Self {
            generation,
            built_at: Utc::now(),
            documents,
        }
    }

    /// Monotonic publication counter; `0` means nothing was ever published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn get(&self, name: &str) -> Option<&RuleDocument> {
        self.documents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in ascending name order.
    pub fn documents(&self) -> impl Iterator<Item = &RuleDocument> {
        self.documents.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}
