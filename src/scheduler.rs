//! Background refresh scheduling.
//!
//! Two policies share the [`RefreshScheduler::start`] / [`RefreshScheduler::stop`]
//! interface and differ only in their trigger:
//!
//! - **Poll** (GitHub): runs a full refresh cycle every interval. A tick is
//!   awaited to completion before the next one can fire, and missed ticks are
//!   skipped, so cycles never overlap.
//! - **Watch** (local directory): subscribes to filesystem notifications on
//!   the rules directory and logs changes to `*.md` files. It does not
//!   rebuild; the local source already rebuilds on every read.

use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::{Config, SourceKind};
use crate::extract::is_rule_file;
use crate::sync::{RefreshStatus, Synchronizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulePolicy {
    Poll { interval: Duration },
    Watch { dir: PathBuf },
}

impl SchedulePolicy {
    pub fn from_config(config: &Config) -> Option<Self> {
        match config.source.kind {
            SourceKind::Local => config.source.local.as_ref().map(|local| SchedulePolicy::Watch {
                dir: local.dir.clone(),
            }),
            SourceKind::Github => {
                config
                    .source
                    .github
                    .as_ref()
                    .map(|github| SchedulePolicy::Poll {
                        interval: github.poll_interval(),
                    })
            }
        }
    }
}

/// A running background task that can be told to stop.
pub struct RefreshScheduler {
    policy: SchedulePolicy,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawns the background task for `policy` on the current runtime.
    ///
    /// The poll policy waits one full interval before its first cycle;
    /// callers are expected to have refreshed once already.
    pub fn start(policy: SchedulePolicy, sync: Arc<Synchronizer>) -> Result<Self> {
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = match &policy {
            SchedulePolicy::Poll { interval } => {
                tokio::spawn(poll_loop(*interval, sync, stop_rx))
            }
            SchedulePolicy::Watch { dir } => {
                let (watcher, events) = watch_dir(dir)?;
                tokio::spawn(watch_loop(dir.clone(), watcher, events, stop_rx))
            }
        };

        tracing::info!(policy = ?policy, "refresh scheduler started");
        Ok(Self {
            policy,
            stop_tx,
            handle,
        })
    }

    /// Stops the task and waits for it to release its timer or watcher.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "refresh scheduler task ended abnormally");
        }
        tracing::info!(policy = ?self.policy, "refresh scheduler stopped");
    }
}

async fn poll_loop(period: Duration, sync: Arc<Synchronizer>, mut stop_rx: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let report = sync.refresh().await;
                if let RefreshStatus::Published { generation } = report.status {
                    tracing::debug!(
                        generation,
                        fetched = report.fetched(),
                        failed = report.failures().count(),
                        "poll cycle complete"
                    );
                }
            }
        }
    }
}

type WatchEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Starts a non-recursive watcher on `dir`. A missing directory is not an
/// error: no watcher is created and the loop just waits to be stopped.
fn watch_dir(dir: &Path) -> Result<(Option<RecommendedWatcher>, WatchEvents)> {
    let (tx, rx) = mpsc::unbounded_channel();

    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "rules directory missing, change notifications disabled");
        return Ok((None, rx));
    }

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    Ok((Some(watcher), rx))
}

async fn watch_loop(
    dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    mut events: WatchEvents,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Dropping the watcher releases the OS handle; keep it for the loop's lifetime.
    let _watcher = watcher;

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            Some(res) = events.recv() => match res {
                Ok(event) => log_event(&event),
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "watch error"),
            },
        }
    }
}

fn log_event(event: &Event) {
    let change = match event.kind {
        EventKind::Create(_) => "created",
        EventKind::Modify(_) => "modified",
        EventKind::Remove(_) => "removed",
        _ => return,
    };

    for path in &event.paths {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        if is_rule_file(&name) {
            tracing::info!(file = %name, change, "rule file changed, reloaded on next read");
        }
    }
}
