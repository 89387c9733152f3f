// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use satchel_core::protocol::RemoteWrite;
use satchel_core::{Action, ActionId, ProgressKey, SubmissionRecord};

use super::client::{ClientConfig, SyncError, SyncResult};
use super::dispatcher::RemoteBackend;
use super::transport::BoxFuture;

/// Client config with millisecond backoff and a short ack timeout.
pub fn fast_client_config() -> ClientConfig {
    ClientConfig {
        url: "ws://mock".to_string(),
        max_retries: 5,
        max_delay_secs: 1,
        initial_delay_ms: 1,
        ack_timeout_ms: 50,
    }
}

/// The canonical mark_read action for user u1, topic t1.
pub fn mark_read(material: &str) -> Action {
    Action::MarkRead(ProgressKey::new("u1", "t1", material))
}

/// A quiz submission for student s1.
pub fn quiz(assignment: &str) -> Action {
    Action::QuizSubmission(SubmissionRecord::new(assignment, "s1").with_score(8.0))
}

/// The remote write a mark_read of material m1 translates to.
pub fn mark_read_write() -> RemoteWrite {
    RemoteWrite::UpsertProgress {
        key: ProgressKey::new("u1", "t1", "m1"),
        completed: true,
    }
}

/// In-memory stand-in for the remote system of record.
///
/// Progress is an upsert keyed by (user, topic, material); every other write
/// appends a row, so replays show up as duplicates.
#[derive(Clone, Default)]
pub struct MockBackend {
    remote: Arc<Mutex<MockRemote>>,
}

#[derive(Default)]
struct MockRemote {
    progress: HashMap<ProgressKey, bool>,
    rows: Vec<(&'static str, Option<ActionId>, RemoteWrite)>,
    apply_calls: usize,
    ready_calls: usize,
    unavailable: bool,
    rejected: HashSet<ActionId>,
    /// Commit, then report a lost ack (once per id).
    lose_ack: HashSet<ActionId>,
    /// Writes left before the link drops; `None` keeps it up.
    link_budget: Option<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn remote(&self) -> std::sync::MutexGuard<'_, MockRemote> {
        self.remote.lock().unwrap()
    }

    /// Reject every write for this action.
    pub fn reject(&self, id: ActionId) {
        self.remote().rejected.insert(id);
    }

    /// Stop rejecting writes for this action.
    pub fn accept(&self, id: ActionId) {
        self.remote().rejected.remove(&id);
    }

    /// Commit the next write for this action but report an ack timeout.
    pub fn lose_ack(&self, id: ActionId) {
        self.remote().lose_ack.insert(id);
    }

    /// Let `n` more writes through, then fail every write as a dropped link
    /// until [`MockBackend::restore_link`].
    pub fn drop_link_after(&self, n: usize) {
        self.remote().link_budget = Some(n);
    }

    pub fn restore_link(&self) {
        self.remote().link_budget = None;
    }

    /// Make `ensure_ready` fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.remote().unavailable = unavailable;
    }

    /// Number of `apply` calls, successful or not.
    pub fn apply_calls(&self) -> usize {
        self.remote().apply_calls
    }

    pub fn ready_calls(&self) -> usize {
        self.remote().ready_calls
    }

    /// Rows in the given remote table.
    pub fn row_count(&self, table: &str) -> usize {
        let remote = self.remote();
        if table == "progress" {
            remote.progress.len()
        } else {
            remote.rows.iter().filter(|(t, _, _)| *t == table).count()
        }
    }

    /// Progress rows as (key, completed).
    pub fn progress_rows(&self) -> Vec<(ProgressKey, bool)> {
        self.remote()
            .progress
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Client refs of submission rows for an assignment, in insert order.
    pub fn submission_refs(&self, assignment_id: &str) -> Vec<Option<ActionId>> {
        self.remote()
            .rows
            .iter()
            .filter_map(|(_, client_ref, write)| match write {
                RemoteWrite::InsertSubmission { record, .. }
                    if record.assignment_id == assignment_id =>
                {
                    Some(*client_ref)
                }
                _ => None,
            })
            .collect()
    }
}

impl RemoteBackend for MockBackend {
    fn ensure_ready(&mut self) -> BoxFuture<'_, SyncResult<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let mut remote = self.remote();
            remote.ready_calls += 1;
            if remote.unavailable {
                return Err(SyncError::MaxRetriesExceeded);
            }
            Ok(())
        })
    }

    fn apply(&mut self, client_ref: ActionId, write: RemoteWrite) -> BoxFuture<'_, SyncResult<i64>> {
        Box::pin(async move {
            // Suspend like a network call so overlapping passes can interleave.
            tokio::task::yield_now().await;

            let mut remote = self.remote();
            remote.apply_calls += 1;
            match remote.link_budget {
                Some(0) => return Err(SyncError::NotConnected),
                Some(n) => remote.link_budget = Some(n - 1),
                None => {}
            }
            if remote.rejected.contains(&client_ref) {
                return Err(SyncError::Rejected(format!("action {client_ref} rejected")));
            }

            match &write {
                RemoteWrite::UpsertProgress { key, completed } => {
                    remote.progress.insert(key.clone(), *completed);
                }
                other => {
                    let table = other.table();
                    remote.rows.push((table, Some(client_ref), write.clone()));
                }
            }
            let row_id = i64::try_from(remote.rows.len() + remote.progress.len()).unwrap();

            if remote.lose_ack.remove(&client_ref) {
                return Err(SyncError::AckTimeout {
                    request_id: 0,
                    timeout_ms: 0,
                });
            }
            Ok(row_id)
        })
    }
}
