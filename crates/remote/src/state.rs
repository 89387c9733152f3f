// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the record database for thread-safe access from connection tasks.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use satchel_core::protocol::RemoteWrite;
use satchel_core::{ActionId, ProgressKey, Result};

use crate::records::{ProgressRow, RecordDb, SubmissionRow};

/// Shared server state containing the record database.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    /// The canonical records (protected by mutex for writes).
    db: Mutex<RecordDb>,
    /// Number of upcoming writes to commit without acknowledging.
    ///
    /// Simulates "server committed, client never saw the ack".
    swallow_acks: AtomicUsize,
}

impl ServerState {
    /// Creates a new server state with the record database in the given directory.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db = RecordDb::open(&data_dir.join("records.db"))?;
        Ok(Self::with_db(db))
    }

    /// Creates a server state backed by an in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_db(RecordDb::open_in_memory()?))
    }

    fn with_db(db: RecordDb) -> Self {
        ServerState {
            inner: Arc::new(ServerStateInner {
                db: Mutex::new(db),
                swallow_acks: AtomicUsize::new(0),
            }),
        }
    }

    /// Applies a write and returns the affected row id.
    pub async fn apply_write(&self, client_ref: Option<ActionId>, write: &RemoteWrite) -> Result<i64> {
        let db = self.inner.db.lock().await;
        db.apply(client_ref, write)
    }

    /// Commit the next `n` writes without sending their acks.
    pub fn swallow_next_acks(&self, n: usize) {
        self.inner.swallow_acks.store(n, Ordering::SeqCst);
    }

    /// Consumes one pending ack suppression, if any.
    pub(crate) fn take_swallowed_ack(&self) -> bool {
        self.inner
            .swallow_acks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Number of rows in a record table.
    pub async fn count(&self, table: &str) -> Result<usize> {
        self.inner.db.lock().await.count(table)
    }

    /// Looks up a progress row.
    pub async fn progress(&self, key: &ProgressKey) -> Result<Option<ProgressRow>> {
        self.inner.db.lock().await.progress(key)
    }

    /// All submissions for an assignment.
    pub async fn submissions_for(&self, assignment_id: &str) -> Result<Vec<SubmissionRow>> {
        self.inner.db.lock().await.submissions_for(assignment_id)
    }
}
