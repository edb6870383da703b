//! The capability set every rule source implements.
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │           RuleSource            │
//! │  ┌─────────────┐ ┌───────────┐  │
//! │  │  LocalDir   │ │  GitHub   │  │
//! │  │ (source_fs) │ │ (contents │  │
//! │  │             │ │   API)    │  │
//! │  └─────────────┘ └───────────┘  │
//! └───────────────┬─────────────────┘
//!                 ▼
//!      Synchronizer::refresh() → SnapshotStore::swap()
//! ```
//!
//! A source is picked once at startup from configuration
//! (see [`crate::sources::build_source`]) and used through `Arc<dyn RuleSource>`.

use async_trait::async_trait;

use crate::config::SourceKind;
use crate::error::SourceError;
use crate::models::{Listing, SourceEntry};

/// Enumerates and fetches rule documents from exactly one backing store.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use rules_mcp::config::SourceKind;
/// use rules_mcp::error::SourceError;
/// use rules_mcp::models::{Listing, SourceEntry};
/// use rules_mcp::traits::RuleSource;
///
/// struct Fixed;
///
/// #[async_trait]
/// impl RuleSource for Fixed {
///     fn kind(&self) -> SourceKind { SourceKind::Local }
///     fn label(&self) -> String { "fixed".to_string() }
///
///     async fn list(&self) -> Result<Listing, SourceError> {
///         Ok(Listing::Entries(vec![SourceEntry {
///             name: "a.md".to_string(),
///             fingerprint: Some("v1".to_string()),
///             location: "a.md".to_string(),
///         }]))
///     }
///
///     async fn fetch(&self, _entry: &SourceEntry) -> Result<String, SourceError> {
///         Ok("# A".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait RuleSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Human-readable location of the source, for logs and status output.
    fn label(&self) -> String;

    /// Enumerates rule documents.
    ///
    /// Returns [`Listing::NotModified`] when the source can prove nothing
    /// changed since the previous successful listing. Failing outright means
    /// the refresh aborts and the published snapshot is kept.
    async fn list(&self) -> Result<Listing, SourceError>;

    /// Fetches one document body.
    async fn fetch(&self, entry: &SourceEntry) -> Result<String, SourceError>;

    /// Fingerprint for a fetched document. Defaults to the one the listing
    /// supplied.
    fn fingerprint(&self, entry: &SourceEntry, _body: &str) -> Option<String> {
        entry.fingerprint.clone()
    }

    /// Whether every read must rebuild the snapshot first.
    fn reload_on_read(&self) -> bool {
        false
    }

    /// Forget any conditional-request state so the next [`list`](Self::list)
    /// performs a full enumeration.
    fn invalidate(&self) {}
}
