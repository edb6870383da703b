//! Local directory rule source.
//!
//! Lists `*.md` files directly inside one directory (no recursion) and reads
//! them whole on every refresh. There is no staleness check: each refresh is a
//! complete rebuild, so [`reload_on_read`](RuleSource::reload_on_read) is on
//! and readers always see what is on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SourceKind;
use crate::error::SourceError;
use crate::extract::{content_fingerprint, is_rule_file};
use crate::models::{Listing, SourceEntry};
use crate::traits::RuleSource;

pub struct LocalDirSource {
    dir: PathBuf,
}

impl LocalDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl RuleSource for LocalDirSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn label(&self) -> String {
        self.dir.display().to_string()
    }

    async fn list(&self) -> Result<Listing, SourceError> {
        let dir = self.dir.clone();
        let label = self.label();
        tokio::task::spawn_blocking(move || scan_dir(&dir))
            .await
            .map_err(|e| SourceError::unavailable(&label, e))?
            .map(Listing::Entries)
            .map_err(|e| SourceError::unavailable(label, e))
    }

    async fn fetch(&self, entry: &SourceEntry) -> Result<String, SourceError> {
        tokio::fs::read_to_string(&entry.location)
            .await
            .map_err(|e| SourceError::document(&entry.name, e))
    }

    fn fingerprint(&self, _entry: &SourceEntry, body: &str) -> Option<String> {
        Some(content_fingerprint(body))
    }

    fn reload_on_read(&self) -> bool {
        true
    }
}

/// Lists rule files in `dir`, sorted by name. Symlinked files are listed
/// like regular ones. A missing directory yields an empty listing.
fn scan_dir(dir: &Path) -> Result<Vec<SourceEntry>, walkdir::Error> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "rules directory does not exist");
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Dangling links and unreadable entries only cost that one file.
            Err(e) if e.depth() > 0 => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping directory entry");
                continue;
            }
            Err(e) => return Err(e),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_rule_file(&name) {
            continue;
        }
        entries.push(SourceEntry {
            name,
            fingerprint: None,
            location: entry.path().display().to_string(),
        });
    }

    Ok(entries)
}
