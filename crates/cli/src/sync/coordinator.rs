// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync coordinator: drains the pending backlog through the dispatcher.
//!
//! At most one pass runs at a time. The dispatcher lives behind an async
//! mutex that a pass takes with `try_lock`; a trigger that arrives while a
//! pass holds it returns [`PassOutcome::Skipped`] instead of queueing a second
//! delivery of the same actions. The lock and the in-flight flag are guards,
//! so every exit path releases them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use satchel_core::{ActionStatus, ActionStore, FailureOutcome, Result, RetryPolicy};

use super::dispatcher::{Dispatcher, RemoteBackend};
use super::network::Reconnected;

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another pass holds the dispatcher.
    InFlight,
    /// The backlog is empty.
    NothingPending,
    /// Pending actions exist but all are backing off.
    NothingDue,
    /// The remote could not be reached.
    BackendUnavailable,
}

/// Aggregate result of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Actions taken from the snapshot.
    pub attempted: usize,
    pub synced: usize,
    /// Failed this pass, still pending for a later retry.
    pub failed: usize,
    /// Failed this pass and moved to `failed`.
    pub dead_lettered: usize,
    /// Left pending because this build cannot deliver their kind.
    pub unknown: usize,
    /// Left pending, without charging an attempt, because the link dropped.
    pub deferred: usize,
}

impl PassReport {
    /// One-line, user-facing summary.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "synced {} {}",
            self.synced,
            if self.synced == 1 { "item" } else { "items" }
        );

        let mut notes = Vec::new();
        if self.failed > 0 {
            notes.push(format!("{} will retry", self.failed));
        }
        if self.dead_lettered > 0 {
            notes.push(format!("{} failed permanently", self.dead_lettered));
        }
        if self.unknown > 0 {
            notes.push(format!("{} of unknown kind", self.unknown));
        }
        if self.deferred > 0 {
            notes.push(format!("{} deferred, connection lost", self.deferred));
        }
        if !notes.is_empty() {
            summary.push_str(&format!(" ({})", notes.join(", ")));
        }
        summary
    }

    /// True if every attempted action was synced.
    pub fn is_clean(&self) -> bool {
        self.synced == self.attempted
    }
}

/// Result of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Skipped(SkipReason),
    Completed(PassReport),
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Skipped(_) => None,
        }
    }
}

/// Raises the syncing flag for its lifetime.
struct InFlight<'a> {
    flag: &'a watch::Sender<bool>,
}

impl<'a> InFlight<'a> {
    fn raise(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        InFlight { flag }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.send_replace(false);
    }
}

/// Orchestrates sync passes over an [`ActionStore`].
pub struct SyncCoordinator<B> {
    store: Arc<ActionStore>,
    dispatcher: Mutex<Dispatcher<B>>,
    policy: RetryPolicy,
    syncing: watch::Sender<bool>,
    reports: watch::Sender<Option<PassReport>>,
}

impl<B: RemoteBackend> SyncCoordinator<B> {
    pub fn new(store: Arc<ActionStore>, backend: B, policy: RetryPolicy) -> Self {
        let (syncing, _) = watch::channel(false);
        let (reports, _) = watch::channel(None);
        SyncCoordinator {
            store,
            dispatcher: Mutex::new(Dispatcher::new(backend)),
            policy,
            syncing,
            reports,
        }
    }

    pub fn store(&self) -> &Arc<ActionStore> {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether a pass is running right now.
    pub fn is_syncing(&self) -> bool {
        *self.syncing.borrow()
    }

    /// Watch the syncing flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.syncing.subscribe()
    }

    /// Report of the most recent completed pass.
    pub fn last_report(&self) -> Option<PassReport> {
        *self.reports.borrow()
    }

    /// Watch completed pass reports.
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<PassReport>> {
        self.reports.subscribe()
    }

    /// Manual trigger. Shares the single-flight guard with every other trigger.
    pub async fn force_sync(&self) -> Result<PassOutcome> {
        debug!("manual sync requested");
        self.run_sync_pass().await
    }

    /// Run one pass over a snapshot of the due backlog.
    ///
    /// Per-action failures are recorded and the pass moves on. A dropped
    /// connection ends the pass without charging the remaining actions, and
    /// store errors abort it. Store calls run inline on this task; they are
    /// short local SQLite statements.
    pub async fn run_sync_pass(&self) -> Result<PassOutcome> {
        let Ok(mut dispatcher) = self.dispatcher.try_lock() else {
            debug!("sync pass already in flight");
            return Ok(PassOutcome::Skipped(SkipReason::InFlight));
        };

        if self.store.count(ActionStatus::Pending)? == 0 {
            return Ok(PassOutcome::Skipped(SkipReason::NothingPending));
        }

        let _in_flight = InFlight::raise(&self.syncing);

        if let Err(e) = dispatcher.ensure_ready().await {
            warn!("remote unavailable, sync pass skipped: {}", e);
            return Ok(PassOutcome::Skipped(SkipReason::BackendUnavailable));
        }

        let snapshot = self.store.list_due(Utc::now())?;
        if snapshot.is_empty() {
            debug!("pending actions are all backing off");
            return Ok(PassOutcome::Skipped(SkipReason::NothingDue));
        }

        let mut report = PassReport::default();
        for (index, action) in snapshot.iter().enumerate() {
            let result = dispatcher.dispatch(action).await;
            if let Err(e) = &result {
                if e.is_connection_loss() {
                    // The rest of the snapshot waits for the next reconnect
                    report.deferred = snapshot.len() - index;
                    warn!(
                        "remote connection lost, {} action(s) left for the next pass: {}",
                        report.deferred, e
                    );
                    break;
                }
            }
            report.attempted += 1;

            match result {
                Ok(row_id) => {
                    debug!("action {} committed as row {}", action.id, row_id);
                    if self.store.mark_synced(action.id)? {
                        report.synced += 1;
                    }
                }
                Err(e) if e.is_unknown_kind() => {
                    warn!("action {} left pending: {}", action.id, e);
                    report.unknown += 1;
                }
                Err(e) => {
                    let outcome =
                        self.store
                            .record_failure(action.id, &e.to_string(), &self.policy, Utc::now())?;
                    match outcome {
                        FailureOutcome::Retrying {
                            attempts,
                            next_attempt_at,
                        } => {
                            warn!(
                                "action {} failed (attempt {}), retry after {}: {}",
                                action.id, attempts, next_attempt_at, e
                            );
                            report.failed += 1;
                        }
                        FailureOutcome::DeadLettered { attempts } => {
                            warn!(
                                "action {} dead-lettered after {} attempts: {}",
                                action.id, attempts, e
                            );
                            report.dead_lettered += 1;
                        }
                        FailureOutcome::NotPending => {}
                    }
                }
            }
        }

        info!("sync pass finished: {}", report.summary());
        self.reports.send_replace(Some(report));
        Ok(PassOutcome::Completed(report))
    }

    /// Trigger loop: a pass per reconnect event, plus a periodic retry while
    /// online when `retry_interval` is set. Ends on cancel or when the
    /// reconnect channel closes.
    pub async fn run(
        self: Arc<Self>,
        mut reconnects: mpsc::Receiver<Reconnected>,
        online: watch::Receiver<bool>,
        retry_interval: Option<Duration>,
        cancel: CancellationToken,
    ) {
        let mut ticker = retry_interval.map(|period| {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = reconnects.recv() => match event {
                    Some(Reconnected { at }) => {
                        debug!("reconnected at {}", at);
                        self.trigger("reconnect").await;
                    }
                    None => break,
                },
                _ = next_tick(&mut ticker) => {
                    if *online.borrow() {
                        self.trigger("retry timer").await;
                    }
                }
            }
        }
        debug!("sync coordinator stopped");
    }

    async fn trigger(&self, source: &str) {
        match self.run_sync_pass().await {
            Ok(outcome) => debug!("{} pass: {:?}", source, outcome),
            Err(e) => error!("{} pass aborted: {}", source, e),
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
