//! GitHub repository rule source.
//!
//! Lists one folder of a repository through the
//! [contents API](https://docs.github.com/en/rest/repos/contents) and
//! downloads each `*.md` file from the `download_url` the listing supplies.
//!
//! # Conditional listing
//!
//! The `ETag` of the last successful listing is replayed as `If-None-Match`.
//! A `304 Not Modified` answer short-circuits the whole refresh: no bodies
//! are downloaded and the published snapshot stays as it is.
//!
//! # Fingerprints
//!
//! The blob `sha` from the listing is the document fingerprint, so two
//! records with the same fingerprint are byte-identical.
//!
//! # Environment Variables
//!
//! - `GITHUB_TOKEN`: optional, sent as a bearer token (raises rate limits and
//!   grants access to private repositories).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};

use crate::config::{GithubSourceConfig, SourceKind};
use crate::error::SourceError;
use crate::extract::is_rule_file;
use crate::models::{Listing, SourceEntry};
use crate::traits::RuleSource;

const GITHUB_JSON: &str = "application/vnd.github+json";

/// One element of a contents API directory listing.
#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    sha: Option<String>,
    download_url: Option<String>,
}

pub struct GithubSource {
    config: GithubSourceConfig,
    client: reqwest::Client,
    token: Option<String>,
    etag: Mutex<Option<String>>,
}

impl GithubSource {
    pub fn new(config: GithubSourceConfig, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            etag: Mutex::new(None),
        })
    }

    /// Reads the token from `GITHUB_TOKEN`, if set.
    pub fn from_env(config: GithubSourceConfig) -> Result<Self> {
        Self::new(config, std::env::var("GITHUB_TOKEN").ok())
    }

    /// Validator recorded by the last full listing.
    pub fn etag(&self) -> Option<String> {
        self.etag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_etag(&self, etag: Option<String>) {
        *self.etag.lock().unwrap_or_else(PoisonError::into_inner) = etag;
    }

    pub fn contents_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        let path = self.config.path.trim_matches('/');
        let mut url = format!(
            "{}/repos/{}/{}/contents",
            base, self.config.owner, self.config.repo
        );
        if !path.is_empty() {
            url.push('/');
            url.push_str(path);
        }
        url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }
}

#[async_trait]
impl RuleSource for GithubSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Github
    }

    fn label(&self) -> String {
        self.config.label()
    }

    async fn list(&self) -> Result<Listing, SourceError> {
        let mut req = self
            .client
            .get(self.contents_url())
            .query(&[("ref", self.config.branch.as_str())])
            .header(ACCEPT, GITHUB_JSON);
        if let Some(etag) = self.etag() {
            req = req.header(IF_NONE_MATCH, etag);
        }

        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(self.label(), e))?;

        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(Listing::NotModified);
        }
        if !status.is_success() {
            return Err(SourceError::unavailable(
                self.label(),
                format!("listing returned HTTP {}", status),
            ));
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SourceError::unavailable(self.label(), e))?;
        let items: Vec<ContentItem> = serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::unavailable(self.label(), format!("bad listing: {}", e)))?;

        let entries = items
            .into_iter()
            .filter(|item| item.kind == "file" && is_rule_file(&item.name))
            .filter_map(|item| {
                let location = item.download_url?;
                Some(SourceEntry {
                    name: item.name,
                    fingerprint: item.sha,
                    location,
                })
            })
            .collect();

        self.set_etag(etag);
        Ok(Listing::Entries(entries))
    }

    async fn fetch(&self, entry: &SourceEntry) -> Result<String, SourceError> {
        let resp = self
            .authorize(self.client.get(&entry.location))
            .send()
            .await
            .map_err(|e| SourceError::document(&entry.name, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::document(
                &entry.name,
                format!("download returned HTTP {}", status),
            ));
        }

        resp.text()
            .await
            .map_err(|e| SourceError::document(&entry.name, e))
    }

    fn invalidate(&self) {
        self.set_etag(None);
    }
}
