//! MCP server lifecycle.
//!
//! Startup order: build the configured source, run one refresh cycle
//! synchronously, start the background scheduler, then serve MCP on the
//! chosen transport until the client disconnects or SIGINT/SIGTERM arrives.
//! The scheduler is stopped before returning either way.
//!
//! # Transports
//!
//! | Transport | Endpoint |
//! |-----------|----------|
//! | `stdio` | MCP JSON-RPC over stdin/stdout |
//! | `http` | Streamable HTTP at `POST /mcp`, plus `GET /health` |
//!
//! # Client Integration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "rules": {
//!       "command": "rules-mcp",
//!       "args": ["--config", "/path/to/rules.toml", "serve"]
//!     }
//!   }
//! }
//! ```

use anyhow::Context;
use chrono::{DateTime, Utc};
use axum::{extract::State, routing::get, Json, Router};
use clap::ValueEnum;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::mcp::RulesBridge;
use crate::resources::RuleResources;
use crate::scheduler::{RefreshScheduler, SchedulePolicy};
use crate::sources::build_source;
use crate::store::SnapshotStore;
use crate::sync::{RefreshReport, RefreshStatus, Synchronizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

/// Builds the source, store and synchroniser for `config` and runs the
/// initial refresh. A failed initial listing is logged, not fatal: the
/// server starts with an empty snapshot and the scheduler keeps trying.
pub async fn bootstrap(config: &Config) -> anyhow::Result<(Arc<Synchronizer>, RefreshReport)> {
    let source = build_source(config)?;
    tracing::info!(kind = source.kind().as_str(), source = %source.label(), "rule source ready");

    let sync = Arc::new(Synchronizer::new(source, Arc::new(SnapshotStore::new())));
    let report = sync.refresh().await;
    if let RefreshStatus::Published { generation } = report.status {
        tracing::info!(
            generation,
            rules = report.fetched(),
            failed = report.failures().count(),
            "initial rules loaded"
        );
    }

    Ok((sync, report))
}

pub async fn run_server(config: &Config, transport: Transport) -> anyhow::Result<()> {
    let (sync, _) = bootstrap(config).await?;

    let scheduler = match SchedulePolicy::from_config(config) {
        Some(policy) => Some(RefreshScheduler::start(policy, sync.clone())?),
        None => None,
    };

    let bridge = RulesBridge::new(Arc::new(RuleResources::new(sync.clone())));
    let result = match transport {
        Transport::Stdio => serve_stdio(bridge).await,
        Transport::Http => serve_http(bridge, sync, &config.server.bind).await,
    };

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    result
}

async fn serve_stdio(bridge: RulesBridge) -> anyhow::Result<()> {
    let service = bridge
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP stdio transport")?;
    tracing::info!("MCP server ready on stdio");

    let cancel = service.cancellation_token();
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        cancel.cancel();
    });

    let quit = service.waiting().await;
    signals.abort();
    let reason = quit.context("MCP service task failed")?;
    tracing::info!(reason = ?reason, "MCP server stopped");
    Ok(())
}

#[derive(Clone)]
struct AppState {
    sync: Arc<Synchronizer>,
}

async fn serve_http(bridge: RulesBridge, sync: Arc<Synchronizer>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!(addr = %bind, "MCP server listening on http://{}/mcp", bind);

    serve_http_on(listener, bridge, sync, shutdown_signal()).await
}

/// Serves the HTTP transport on `listener` until `signal` resolves.
///
/// Open MCP sessions and their event streams are cancelled before the
/// graceful drain starts; otherwise a connected client would keep the
/// server alive.
pub async fn serve_http_on<F>(
    listener: tokio::net::TcpListener,
    bridge: RulesBridge,
    sync: Arc<Synchronizer>,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sessions = CancellationToken::new();
    let app = http_router(bridge, sync, sessions.child_token());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("shutdown signal received");
            sessions.cancel();
        })
        .await?;

    Ok(())
}

fn http_router(bridge: RulesBridge, sync: Arc<Synchronizer>, sessions: CancellationToken) -> Router {
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            cancellation_token: sessions,
            ..Default::default()
        },
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .with_state(AppState { sync })
        .nest_service("/mcp", mcp_service)
        .layer(cors)
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    source: String,
    generation: u64,
    built_at: DateTime<Utc>,
    rules: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.sync.store().read();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        source: state.sync.source().label(),
        generation: snapshot.generation(),
        built_at: snapshot.built_at(),
        rules: snapshot.len(),
    })
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
