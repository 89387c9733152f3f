// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running sync: check the remote, replay the backlog whenever it comes
//! back, and print a status line whenever something changes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sync::{
    ConnectivityChecker, NetworkMonitor, RemoteBackend, RemoteClient, StatusReporter,
    SyncCoordinator, SyncStatus,
};

use super::{acquire_sync_lock, runtime, Context};

/// How often synced actions past the retention window are pruned.
const PRUNE_EVERY: Duration = Duration::from_secs(3600);

pub fn run(ctx: &Context) -> Result<()> {
    let _lock = acquire_sync_lock(&ctx.state_dir)?;
    let rt = runtime()?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, shutting down");
                on_signal.cancel();
            }
        });

        let backend = RemoteClient::new(ctx.config.remote.client_config());
        run_until(ctx, backend, cancel, |line| println!("{}", line)).await
    })
}

/// Run the sync engine until `cancel` fires, passing each changed status
/// line to `emit`.
pub(crate) async fn run_until<B, F>(
    ctx: &Context,
    backend: B,
    cancel: CancellationToken,
    mut emit: F,
) -> Result<()>
where
    B: RemoteBackend + 'static,
    F: FnMut(&str),
{
    let remote = &ctx.config.remote;
    let checker = ConnectivityChecker::from_url(&remote.url, remote.check_interval(), remote.check_timeout())
        .ok_or_else(|| Error::Config(format!("remote url '{}' has no host to check", remote.url)))?;

    let store = Arc::new(ctx.open_store()?);
    let (monitor, reconnects) = NetworkMonitor::new(false);
    let monitor = Arc::new(monitor);
    let coordinator = Arc::new(SyncCoordinator::new(
        Arc::clone(&store),
        backend,
        ctx.config.sync.retry_policy(),
    ));
    let reporter = Arc::new(StatusReporter::new(
        Arc::clone(&coordinator),
        monitor.subscribe(),
    )?);

    info!("watching {} (checking {})", remote.url, checker.address());
    let poll = ctx.config.sync.status_poll();
    let tasks = vec![
        tokio::spawn(Arc::clone(&coordinator).run(
            reconnects,
            monitor.subscribe(),
            ctx.config.sync.retry_interval(),
            cancel.clone(),
        )),
        tokio::spawn(checker.run(Arc::clone(&monitor), cancel.clone())),
        Arc::clone(&reporter).spawn_poller(poll, cancel.clone()),
    ];

    let retention = ctx.config.sync.retention();
    let mut last_prune: Option<Instant> = None;
    let mut last_status: Option<SyncStatus> = None;
    let mut ticker = tokio::time::interval(poll);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let status = reporter.snapshot();
                if last_status != Some(status) {
                    emit(&format_status(&status));
                    last_status = Some(status);
                }

                if let Some(retention) = retention {
                    let due = match last_prune {
                        None => true,
                        Some(at) => at.elapsed() >= PRUNE_EVERY,
                    };
                    if due {
                        last_prune = Some(Instant::now());
                        match store.prune_synced(Utc::now() - retention) {
                            Ok(0) => {}
                            Ok(n) => info!("pruned {} synced action(s)", n),
                            Err(e) => warn!("prune failed: {}", e),
                        }
                    }
                }
            }
        }
    }

    for task in tasks {
        if let Err(e) = task.await {
            warn!("background task ended abnormally: {}", e);
        }
    }
    debug!("watch stopped");
    Ok(())
}

/// One status line: connectivity, activity, backlog, last pass.
pub(crate) fn format_status(status: &SyncStatus) -> String {
    let mut line = format!(
        "{} | {} | pending {} | failed {}",
        if status.online { "online" } else { "offline" },
        if status.syncing { "syncing" } else { "idle" },
        status.pending,
        status.failed
    );
    if let Some(report) = &status.last_report {
        line.push_str(&format!(" | last pass: {}", report.summary()));
    }
    line
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
