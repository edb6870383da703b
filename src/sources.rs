//! Source construction and health reporting.
//!
//! [`build_source`] turns the `[source]` config section into the one
//! [`RuleSource`] a process serves. [`get_source_status`] backs the
//! `rules-mcp sources` command.
//!
//! | Kind | Healthy When |
//! |------|-------------|
//! | `local` | Configured directory exists |
//! | `github` | Configuration is complete (reachability is checked at sync time) |

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, SourceKind};
use crate::source_fs::LocalDirSource;
use crate::source_github::GithubSource;
use crate::traits::RuleSource;

/// Builds the configured source.
pub fn build_source(config: &Config) -> Result<Arc<dyn RuleSource>> {
    match config.source.kind {
        SourceKind::Local => {
            let local = config
                .source
                .local
                .as_ref()
                .ok_or_else(|| anyhow!("Local source not configured"))?;
            Ok(Arc::new(LocalDirSource::new(&local.dir)))
        }
        SourceKind::Github => {
            let github = config
                .source
                .github
                .as_ref()
                .ok_or_else(|| anyhow!("GitHub source not configured"))?;
            Ok(Arc::new(GithubSource::from_env(github.clone())?))
        }
    }
}

/// Health and configuration status of the active source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    /// `"local"` or `"github"`.
    pub kind: String,
    pub location: String,
    pub healthy: bool,
    pub notes: Option<String>,
}

pub fn get_source_status(config: &Config) -> SourceStatus {
    match config.source.kind {
        SourceKind::Local => match &config.source.local {
            Some(local) => {
                let exists = local.dir.is_dir();
                SourceStatus {
                    kind: SourceKind::Local.as_str().to_string(),
                    location: local.dir.display().to_string(),
                    healthy: exists,
                    notes: (!exists).then(|| "directory does not exist".to_string()),
                }
            }
            None => not_configured(SourceKind::Local),
        },
        SourceKind::Github => match &config.source.github {
            Some(github) => {
                let authenticated = std::env::var("GITHUB_TOKEN")
                    .map(|t| !t.trim().is_empty())
                    .unwrap_or(false);
                SourceStatus {
                    kind: SourceKind::Github.as_str().to_string(),
                    location: github.label(),
                    healthy: true,
                    notes: Some(format!(
                        "poll every {}s, {}",
                        github.poll_interval_secs,
                        if authenticated {
                            "authenticated"
                        } else {
                            "anonymous"
                        }
                    )),
                }
            }
            None => not_configured(SourceKind::Github),
        },
    }
}

fn not_configured(kind: SourceKind) -> SourceStatus {
    SourceStatus {
        kind: kind.as_str().to_string(),
        location: String::new(),
        healthy: false,
        notes: Some("not configured".to_string()),
    }
}

pub fn list_sources(config: &Config) -> Result<()> {
    let status = get_source_status(config);

    println!("{:<8} {:<8} LOCATION", "SOURCE", "HEALTHY");
    println!(
        "{:<8} {:<8} {}",
        status.kind, status.healthy, status.location
    );
    if let Some(notes) = status.notes {
        println!("  {}", notes);
    }

    Ok(())
}
