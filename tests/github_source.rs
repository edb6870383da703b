//! Integration tests for the GitHub source against an in-process emulation
//! of the contents API (ETag / If-None-Match / 304, download URLs and
//! injected failures).

use axum::{
    extract::{Path, State},
    http::{
        header::{ETAG, IF_NONE_MATCH},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rules_mcp::config::GithubSourceConfig;
use rules_mcp::error::{ResourceError, SourceError};
use rules_mcp::resources::RuleResources;
use rules_mcp::source_github::GithubSource;
use rules_mcp::store::SnapshotStore;
use rules_mcp::sync::{RefreshStatus, Synchronizer};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ─── Mock repository ────────────────────────────────────────────────

#[derive(Clone)]
struct MockFile {
    sha: String,
    body: String,
    fail: bool,
}

struct MockRepo {
    base: String,
    version: AtomicUsize,
    files: Mutex<BTreeMap<String, MockFile>>,
    listing_failure: Mutex<Option<StatusCode>>,
    list_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockRepo {
    fn etag(&self) -> String {
        format!("\"v{}\"", self.version.load(Ordering::SeqCst))
    }

    /// Changes content and the listing validator, like a push would.
    fn put(&self, name: &str, sha: &str, body: &str) {
        self.files.lock().unwrap().insert(
            name.to_string(),
            MockFile {
                sha: sha.to_string(),
                body: body.to_string(),
                fail: false,
            },
        );
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, name: &str) {
        self.files.lock().unwrap().remove(name);
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Download failures do not change the listing validator.
    fn set_download_failure(&self, name: &str, fail: bool) {
        if let Some(file) = self.files.lock().unwrap().get_mut(name) {
            file.fail = fail;
        }
    }

    fn set_listing_failure(&self, status: Option<StatusCode>) {
        *self.listing_failure.lock().unwrap() = status;
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

async fn list_contents(State(repo): State<Arc<MockRepo>>, headers: HeaderMap) -> Response {
    repo.list_calls.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = *repo.listing_failure.lock().unwrap() {
        return status.into_response();
    }

    let etag = repo.etag();
    let sent = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());
    if sent == Some(etag.as_str()) {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let mut items: Vec<Value> = repo
        .files
        .lock()
        .unwrap()
        .iter()
        .map(|(name, file)| {
            json!({
                "name": name,
                "type": "file",
                "sha": file.sha,
                "download_url": format!("{}/raw/{}", repo.base, name),
            })
        })
        .collect();
    items.push(json!({ "name": "archive", "type": "dir", "sha": "d0", "download_url": null }));
    items.push(json!({
        "name": "README.txt",
        "type": "file",
        "sha": "t0",
        "download_url": format!("{}/raw/README.txt", repo.base),
    }));

    ([(ETAG, etag)], Json(items)).into_response()
}

async fn download(State(repo): State<Arc<MockRepo>>, Path(name): Path<String>) -> Response {
    repo.download_calls.fetch_add(1, Ordering::SeqCst);
    let file = repo.files.lock().unwrap().get(&name).cloned();
    match file {
        Some(file) if !file.fail => file.body.into_response(),
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_mock() -> Arc<MockRepo> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let repo = Arc::new(MockRepo {
        base: format!("http://{}", addr),
        version: AtomicUsize::new(1),
        files: Mutex::new(BTreeMap::new()),
        listing_failure: Mutex::new(None),
        list_calls: AtomicUsize::new(0),
        download_calls: AtomicUsize::new(0),
    });
    repo.put("alpha.md", "sha-a1", "# Alpha Rules\n\nPrefer iterators.");
    repo.put("beta.md", "sha-b1", "# Beta Rules\n\nNo unwrap in libraries.");
    repo.put("gamma.md", "sha-c1", "No heading, just text.");

    let app = Router::new()
        .route("/repos/acme/rules/contents/rules", get(list_contents))
        .route("/raw/{name}", get(download))
        .with_state(repo.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    repo
}

fn github_sync(repo: &MockRepo) -> (Arc<GithubSource>, Arc<Synchronizer>) {
    let mut config = GithubSourceConfig::new("acme", "rules");
    config.path = "rules".to_string();
    config.api_base = repo.base.clone();

    let source = Arc::new(GithubSource::new(config, None).unwrap());
    let sync = Arc::new(Synchronizer::new(
        source.clone(),
        Arc::new(SnapshotStore::new()),
    ));
    (source, sync)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn initial_refresh_publishes_markdown_files() {
    let repo = start_mock().await;
    let (source, sync) = github_sync(&repo);

    let report = sync.refresh().await;
    assert!(report.is_published());
    assert_eq!(report.fetched(), 3);
    assert_eq!(report.failures().count(), 0);

    let snap = sync.store().read();
    let names: Vec<_> = snap.names().collect();
    assert_eq!(names, vec!["alpha.md", "beta.md", "gamma.md"]);
    assert_eq!(snap.get("alpha.md").unwrap().title, "Alpha Rules");
    assert_eq!(snap.get("gamma.md").unwrap().title, "gamma");
    assert_eq!(
        snap.get("beta.md").unwrap().fingerprint.as_deref(),
        Some("sha-b1")
    );

    assert_eq!(source.etag(), Some(repo.etag()));
    // README.txt and the directory are never downloaded.
    assert_eq!(repo.download_calls(), 3);
}

#[tokio::test]
async fn not_modified_listing_skips_downloads() {
    let repo = start_mock().await;
    let (source, sync) = github_sync(&repo);

    sync.refresh().await;
    let before = sync.store().read();
    let etag_before = source.etag();
    let downloads = repo.download_calls();

    let report = sync.refresh().await;
    assert!(matches!(report.status, RefreshStatus::NotModified { .. }));
    assert_eq!(repo.list_calls(), 2);
    assert_eq!(repo.download_calls(), downloads);
    assert_eq!(source.etag(), etag_before);
    assert!(Arc::ptr_eq(&before, &sync.store().read()));
}

#[tokio::test]
async fn one_failed_download_shrinks_snapshot_and_is_retried() {
    let repo = start_mock().await;
    repo.set_download_failure("beta.md", true);
    let (source, sync) = github_sync(&repo);

    let report = sync.refresh().await;
    assert!(report.is_published());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        SourceError::DocumentFetch { name, .. } if name == "beta.md"
    ));

    let snap = sync.store().read();
    let names: Vec<_> = snap.names().collect();
    assert_eq!(names, vec!["alpha.md", "gamma.md"]);
    // The validator is dropped so the next poll lists in full.
    assert_eq!(source.etag(), None);

    repo.set_download_failure("beta.md", false);
    let report = sync.refresh().await;
    assert!(report.is_published());
    assert_eq!(report.changes.added, vec!["beta.md"]);
    assert_eq!(sync.store().read().len(), 3);
}

#[tokio::test]
async fn listing_failure_keeps_previous_snapshot() {
    let repo = start_mock().await;
    let (source, sync) = github_sync(&repo);

    sync.refresh().await;
    let before = sync.store().read();
    let etag = source.etag();

    repo.set_listing_failure(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let report = sync.refresh().await;
    assert!(matches!(
        report.status,
        RefreshStatus::Aborted(SourceError::Unavailable { .. })
    ));
    assert!(Arc::ptr_eq(&before, &sync.store().read()));
    assert_eq!(source.etag(), etag);

    repo.set_listing_failure(Some(StatusCode::FORBIDDEN));
    sync.refresh().await;
    assert_eq!(sync.store().read().len(), 3);
}

#[tokio::test]
async fn unreachable_api_aborts_without_clearing() {
    let mut config = GithubSourceConfig::new("acme", "rules");
    config.api_base = "http://127.0.0.1:1".to_string();
    let source = Arc::new(GithubSource::new(config, None).unwrap());
    let sync = Synchronizer::new(source, Arc::new(SnapshotStore::new()));

    let before = sync.store().read();
    let report = sync.refresh().await;
    assert!(matches!(report.status, RefreshStatus::Aborted(_)));
    assert!(Arc::ptr_eq(&before, &sync.store().read()));
}

#[tokio::test]
async fn pushes_are_reflected_as_changes() {
    let repo = start_mock().await;
    let (_, sync) = github_sync(&repo);
    sync.refresh().await;
    let alpha_before = sync.store().read().get("alpha.md").cloned().unwrap();

    repo.put("beta.md", "sha-b2", "# Beta Rules v2\n");
    repo.remove("gamma.md");
    repo.put("delta.md", "sha-d1", "# Delta\n");

    let report = sync.refresh().await;
    assert_eq!(report.changes.added, vec!["delta.md"]);
    assert_eq!(report.changes.removed, vec!["gamma.md"]);
    assert_eq!(report.changes.modified, vec!["beta.md"]);

    let snap = sync.store().read();
    assert_eq!(snap.get("beta.md").unwrap().title, "Beta Rules v2");
    assert!(!snap.contains("gamma.md"));
    // Unchanged fingerprint, byte-identical record.
    assert_eq!(snap.get("alpha.md").unwrap(), &alpha_before);
}

#[tokio::test]
async fn facade_serves_the_polled_snapshot() {
    let repo = start_mock().await;
    let (_, sync) = github_sync(&repo);
    sync.refresh().await;
    let resources = RuleResources::new(sync.clone());

    let entries = resources.list_resources().await;
    assert_eq!(entries.len(), 3);
    let uris: HashSet<_> = entries.iter().map(|e| e.uri.as_str()).collect();
    assert_eq!(uris.len(), 3);
    assert!(uris.contains("rules:///alpha.md"));

    // Reads never touch the network for a polled source.
    let list_calls = repo.list_calls();
    let body = resources.read_resource("rules:///alpha.md").await.unwrap();
    assert!(body.text.starts_with("# Alpha Rules"));
    assert_eq!(body.mime_type, "text/markdown");
    assert_eq!(repo.list_calls(), list_calls);

    assert_eq!(
        resources.read_resource("rules:///missing.md").await,
        Err(ResourceError::NotFound("missing.md".to_string()))
    );
}
