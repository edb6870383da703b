//! # Rules MCP
//!
//! Serves a set of markdown rule documents as MCP resources, keeping an
//! in-memory snapshot in step with where the rules actually live: a local
//! directory or a folder of a GitHub repository.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  RuleSource  │──▶│ Synchronizer │──▶│ SnapshotStore │
//! │ local/GitHub │   │ list+fetch   │   │   (ArcSwap)   │
//! └──────▲───────┘   └──────▲───────┘   └───────┬───────┘
//!        │                  │                   │
//!  ┌─────┴──────────────────┴──┐         ┌──────▼───────┐
//!  │     RefreshScheduler      │         │ RuleResources │──▶ MCP (rmcp)
//!  │  poll timer / fs watcher  │         │ list / read   │
//!  └───────────────────────────┘         └──────────────┘
//! ```
//!
//! A refresh cycle builds the complete new mapping before publishing it with
//! a single pointer swap, so readers never see a half-updated snapshot. A
//! source that cannot be listed leaves the last good snapshot in place; a
//! single document that cannot be fetched is left out and logged.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Rule documents, listings, snapshots |
//! | [`extract`] | Title extraction and content fingerprints |
//! | [`traits`] | The [`traits::RuleSource`] capability set |
//! | [`source_fs`] | Local directory source |
//! | [`source_github`] | GitHub contents API source |
//! | [`store`] | Atomic snapshot store |
//! | [`sync`] | Refresh cycle and reports |
//! | [`scheduler`] | Polling and filesystem-watch background tasks |
//! | [`resources`] | Resource facade (list/read by `rules:///` URI) |
//! | [`mcp`] | `rmcp` server handler |
//! | [`server`] | Transports and process lifecycle |
//! | [`sources`] | Source construction and health |

pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod resources;
pub mod scheduler;
pub mod server;
pub mod source_fs;
pub mod source_github;
pub mod sources;
pub mod store;
pub mod sync;
pub mod traits;
