// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-mostly status projection for a UI.
//!
//! Backlog counts are polled from the store rather than pushed, so they can
//! lag by up to one poll interval.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use satchel_core::{Result, StatusCounts};

use super::coordinator::{PassOutcome, PassReport, SyncCoordinator};
use super::dispatcher::RemoteBackend;

/// Point-in-time view of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub online: bool,
    pub syncing: bool,
    pub pending: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<PassReport>,
}

pub struct StatusReporter<B> {
    coordinator: Arc<SyncCoordinator<B>>,
    online: watch::Receiver<bool>,
    pending: AtomicUsize,
    failed: AtomicUsize,
}

impl<B: RemoteBackend + 'static> StatusReporter<B> {
    /// Create a reporter and take an initial reading of the store.
    pub fn new(coordinator: Arc<SyncCoordinator<B>>, online: watch::Receiver<bool>) -> Result<Self> {
        let reporter = StatusReporter {
            coordinator,
            online,
            pending: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        };
        reporter.refresh()?;
        Ok(reporter)
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn is_syncing(&self) -> bool {
        self.coordinator.is_syncing()
    }

    /// Pending actions as of the last refresh.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Dead-lettered actions as of the last refresh.
    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }

    pub fn last_report(&self) -> Option<PassReport> {
        self.coordinator.last_report()
    }

    /// Re-read backlog counts from the store.
    pub fn refresh(&self) -> Result<StatusCounts> {
        let counts = self.coordinator.store().counts()?;
        self.pending.store(counts.pending, Ordering::Release);
        self.failed.store(counts.failed, Ordering::Release);
        Ok(counts)
    }

    pub fn snapshot(&self) -> SyncStatus {
        SyncStatus {
            online: self.is_online(),
            syncing: self.is_syncing(),
            pending: self.pending_count(),
            failed: self.failed_count(),
            last_report: self.last_report(),
        }
    }

    /// Run a pass now, then refresh the counts.
    pub async fn force_sync(&self) -> Result<PassOutcome> {
        let outcome = self.coordinator.force_sync().await?;
        self.refresh()?;
        Ok(outcome)
    }

    /// Refresh on every `interval` until cancelled.
    pub fn spawn_poller(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh() {
                            warn!("status refresh failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}
