//! Refresh cycle: enumerate the source, fetch every body, assemble a new
//! mapping off to the side, then publish it with one swap.
//!
//! # Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Listing fails | Cycle aborts, published snapshot untouched |
//! | Listing says "not modified" | Nothing fetched, published snapshot untouched |
//! | One body fails | That document is left out, the rest is published |
//!
//! Every absorbed failure is logged and also returned in the
//! [`RefreshReport`], so callers and tests can inspect what happened.
//!
//! # Concurrency
//!
//! Cycles are serialised by an async mutex: there is never more than one
//! writer. A reload-on-read caller that finds a cycle already running waits
//! for it and reuses its result instead of queueing another rebuild.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::SourceError;
use crate::extract::extract_title;
use crate::models::{Listing, RuleDocument, Snapshot};
use crate::store::SnapshotStore;
use crate::traits::RuleSource;

/// How a refresh cycle ended.
#[derive(Debug)]
pub enum RefreshStatus {
    /// A new snapshot was swapped in.
    Published { generation: u64 },
    /// The source reported no change; the current generation stays.
    NotModified { generation: u64 },
    /// The source could not be listed; the current snapshot stays.
    Aborted(SourceError),
}

/// Per-document result of a cycle.
#[derive(Debug)]
pub enum DocumentOutcome {
    Fetched { name: String },
    Failed(SourceError),
}

/// Names that differ between the previous snapshot and the new mapping.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Present in both, with a different or missing fingerprint.
    pub modified: Vec<String>,
}

impl ChangeSet {
    pub fn between(previous: &Snapshot, next: &BTreeMap<String, RuleDocument>) -> Self {
        let mut changes = ChangeSet::default();

        for (name, doc) in next {
            match previous.get(name) {
                None => changes.added.push(name.clone()),
                Some(old) => {
                    let same = matches!(
                        (&old.fingerprint, &doc.fingerprint),
                        (Some(a), Some(b)) if a == b
                    );
                    if !same {
                        changes.modified.push(name.clone());
                    }
                }
            }
        }

        changes.removed = previous
            .names()
            .filter(|name| !next.contains_key(*name))
            .map(str::to_string)
            .collect();

        changes
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

#[derive(Debug)]
pub struct RefreshReport {
    pub status: RefreshStatus,
    pub outcomes: Vec<DocumentOutcome>,
    pub changes: ChangeSet,
}

impl RefreshReport {
    fn unpublished(status: RefreshStatus) -> Self {
        Self {
            status,
            outcomes: Vec::new(),
            changes: ChangeSet::default(),
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self.status, RefreshStatus::Published { .. })
    }

    pub fn fetched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Fetched { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceError> {
        self.outcomes.iter().filter_map(|o| match o {
            DocumentOutcome::Failed(e) => Some(e),
            DocumentOutcome::Fetched { .. } => None,
        })
    }
}

/// Owns the link between one [`RuleSource`] and one [`SnapshotStore`].
pub struct Synchronizer {
    source: Arc<dyn RuleSource>,
    store: Arc<SnapshotStore>,
    cycle: Mutex<()>,
}

impl Synchronizer {
    pub fn new(source: Arc<dyn RuleSource>, store: Arc<SnapshotStore>) -> Self {
        Self {
            source,
            store,
            cycle: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &dyn RuleSource {
        self.source.as_ref()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Runs one full refresh cycle, waiting for any cycle already in flight.
    pub async fn refresh(&self) -> RefreshReport {
        let _guard = self.cycle.lock().await;
        self.run_cycle().await
    }

    /// The snapshot readers should be served.
    ///
    /// For reload-on-read sources this rebuilds first; otherwise it returns
    /// whatever the last completed cycle published.
    pub async fn current(&self) -> Arc<Snapshot> {
        if self.source.reload_on_read() {
            match self.cycle.try_lock() {
                Ok(_guard) => {
                    self.run_cycle().await;
                }
                Err(_) => {
                    let _joined = self.cycle.lock().await;
                }
            }
        }
        self.store.read()
    }

    async fn run_cycle(&self) -> RefreshReport {
        let previous = self.store.read();

        let entries = match self.source.list().await {
            Ok(Listing::Entries(entries)) => entries,
            Ok(Listing::NotModified) => {
                tracing::debug!(source = %self.source.label(), "rules not modified");
                return RefreshReport::unpublished(RefreshStatus::NotModified {
                    generation: previous.generation(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh aborted, keeping previous rules");
                return RefreshReport::unpublished(RefreshStatus::Aborted(e));
            }
        };

        let mut documents = BTreeMap::new();
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            match self.source.fetch(&entry).await {
                Ok(body) => {
                    let fingerprint = self.source.fingerprint(&entry, &body);
                    let title = extract_title(&body, &entry.name);
                    outcomes.push(DocumentOutcome::Fetched {
                        name: entry.name.clone(),
                    });
                    documents.insert(
                        entry.name.clone(),
                        RuleDocument {
                            name: entry.name,
                            title,
                            body,
                            fingerprint,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping rule");
                    outcomes.push(DocumentOutcome::Failed(e));
                }
            }
        }

        let failed = outcomes
            .iter()
            .any(|o| matches!(o, DocumentOutcome::Failed(_)));
        if failed {
            // Force a full listing next time so the failed documents get retried.
            self.source.invalidate();
        }

        let changes = ChangeSet::between(&previous, &documents);
        if !changes.is_empty() {
            tracing::info!(
                added = ?changes.added,
                removed = ?changes.removed,
                modified = ?changes.modified,
                "rules changed"
            );
        }

        let published = self.store.swap(documents);
        tracing::debug!(
            generation = published.generation(),
            documents = published.len(),
            "published rule snapshot"
        );

        RefreshReport {
            status: RefreshStatus::Published {
                generation: published.generation(),
            },
            outcomes,
            changes,
        }
    }
}
