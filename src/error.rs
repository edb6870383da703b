//! Error taxonomy.
//!
//! [`SourceError`]s are absorbed by the refresh cycle and only logged or
//! reported; they never reach resource readers. [`ResourceError`]s are
//! caller-input failures and are returned to the requester.

use thiserror::Error;

/// Failures raised while talking to a rule source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be enumerated at all. The refresh aborts and the
    /// previous snapshot stays published.
    #[error("source {source_label} unavailable: {reason}")]
    Unavailable {
        source_label: String,
        reason: String,
    },

    /// A single document could not be read or downloaded. It is left out of
    /// the snapshot being built.
    #[error("failed to fetch rule '{name}': {reason}")]
    DocumentFetch { name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_label: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            source_label: source_label.into(),
            reason: reason.to_string(),
        }
    }

    pub fn document(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::DocumentFetch {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures surfaced to resource readers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("rule not found: {0}")]
    NotFound(String),

    #[error("malformed rule URI: {0}")]
    MalformedUri(String),
}
