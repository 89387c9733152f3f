// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable store for offline actions.
//!
//! The [`ActionStore`] is the only component that is always available: it has
//! no network dependency and every write is committed before the call returns,
//! so queued actions survive a process restart.
//!
//! Timestamps are stored as fixed-width RFC3339 (`...123456Z`) so that text
//! comparison in SQL matches chronological order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::action::{Action, ActionId, ActionStatus, OfflineAction};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// SQL schema for the action store.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS offline_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'synced', 'failed')),
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    next_attempt_at TEXT,
    created_at TEXT NOT NULL,
    synced_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_actions_status ON offline_actions(status, created_at, id);
"#;

const SELECT_COLUMNS: &str = "SELECT id, kind, payload, status, attempts, last_error,
        next_attempt_at, created_at, synced_at
 FROM offline_actions";

/// Format a timestamp for storage.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Build a conversion error carrying a corrupted-data message.
fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| conversion_error(format!("invalid timestamp '{value}' in column '{column}'")))
}

fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_timestamp(&v, column)).transpose()
}

fn row_to_action(row: &rusqlite::Row<'_>) -> std::result::Result<OfflineAction, rusqlite::Error> {
    let payload_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_str: String = row.get(7)?;

    Ok(OfflineAction {
        id: ActionId(row.get(0)?),
        kind: row.get(1)?,
        payload: serde_json::from_str(&payload_str)
            .map_err(|e| conversion_error(format!("invalid payload JSON: {e}")))?,
        status: status_str
            .parse()
            .map_err(|_| conversion_error(format!("invalid status '{status_str}'")))?,
        attempts: row.get(4)?,
        last_error: row.get(5)?,
        next_attempt_at: parse_timestamp_opt(row.get(6)?, "next_attempt_at")?,
        created_at: parse_timestamp(&created_str, "created_at")?,
        synced_at: parse_timestamp_opt(row.get(8)?, "synced_at")?,
    })
}

fn count_to_usize(n: i64) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::CorruptedData(format!("negative count {n}")))
}

/// What happened to an action after a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still pending; eligible again at `next_attempt_at`.
    Retrying {
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Retry budget exhausted; moved to `failed`.
    DeadLettered { attempts: u32 },
    /// The action was not pending, nothing was recorded.
    NotPending,
}

/// Number of actions in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub synced: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.synced + self.failed
    }
}

/// Durable queue of offline actions.
///
/// The connection sits behind a mutex so a single store can be shared across
/// tasks; every operation holds the lock only for its own statement(s).
/// Calls block the current thread, so async callers run them inline only
/// because each one is a single short local statement.
pub struct ActionStore {
    conn: Mutex<Connection>,
}

impl ActionStore {
    /// Open a store at the given path, creating the file and schema if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(ActionStore {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(ActionStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::StorePoisoned)
    }

    /// Persist a new pending action and return its id.
    pub fn enqueue(&self, action: &Action) -> Result<ActionId> {
        let payload = action.payload()?;
        self.enqueue_raw(action.kind().as_str(), &payload)
    }

    /// Persist a new pending action without checking the kind or payload.
    ///
    /// Rows with kinds this build does not know are kept and left pending.
    pub fn enqueue_raw(&self, kind: &str, payload: &serde_json::Value) -> Result<ActionId> {
        if kind.trim().is_empty() {
            return Err(Error::InvalidInput("action kind cannot be empty".to_string()));
        }
        let payload = serde_json::to_string(payload)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO offline_actions (kind, payload, status, created_at)
             VALUES (?1, ?2, 'pending', ?3)",
            params![kind, payload, format_timestamp(Utc::now())],
        )?;
        Ok(ActionId(conn.last_insert_rowid()))
    }

    /// Get a single action by id.
    pub fn get(&self, id: ActionId) -> Result<OfflineAction> {
        let conn = self.conn()?;
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        conn.query_row(&sql, params![id.0], row_to_action)
            .optional()?
            .ok_or(Error::ActionNotFound(id.0))
    }

    /// List actions with the given status, oldest first.
    pub fn list_by_status(&self, status: ActionStatus) -> Result<Vec<OfflineAction>> {
        let conn = self.conn()?;
        let sql = format!("{SELECT_COLUMNS} WHERE status = ?1 ORDER BY created_at, id");
        let mut stmt = conn.prepare(&sql)?;
        let actions = stmt
            .query_map(params![status.as_str()], row_to_action)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(actions)
    }

    /// List pending actions whose backoff has elapsed at `now`, oldest first.
    pub fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<OfflineAction>> {
        let conn = self.conn()?;
        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE status = 'pending'
               AND (next_attempt_at IS NULL OR next_attempt_at <= ?1)
             ORDER BY created_at, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let actions = stmt
            .query_map(params![format_timestamp(now)], row_to_action)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(actions)
    }

    /// Count actions with the given status.
    pub fn count(&self, status: ActionStatus) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM offline_actions WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        count_to_usize(n)
    }

    /// Count actions in every status with one query.
    pub fn counts(&self) -> Result<StatusCounts> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM offline_actions GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            let n = count_to_usize(n)?;
            match status.parse::<ActionStatus>()? {
                ActionStatus::Pending => counts.pending = n,
                ActionStatus::Synced => counts.synced = n,
                ActionStatus::Failed => counts.failed = n,
            }
        }
        Ok(counts)
    }

    /// Mark a pending action as synced.
    ///
    /// Idempotent: returns `false` if the action was not pending (already
    /// synced, dead-lettered, or unknown).
    pub fn mark_synced(&self, id: ActionId) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE offline_actions
             SET status = 'synced', synced_at = ?1, next_attempt_at = NULL
             WHERE id = ?2 AND status = 'pending'",
            params![format_timestamp(Utc::now()), id.0],
        )?;
        Ok(affected > 0)
    }

    /// Record a failed delivery attempt and schedule the next one.
    pub fn record_failure(
        &self,
        id: ActionId,
        error: &str,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current: Option<(String, u32)> = tx
            .query_row(
                "SELECT status, attempts FROM offline_actions WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (status, attempts) = current.ok_or(Error::ActionNotFound(id.0))?;
        if status.parse::<ActionStatus>()? != ActionStatus::Pending {
            return Ok(FailureOutcome::NotPending);
        }

        let attempts = attempts.saturating_add(1);
        let outcome = if policy.is_exhausted(attempts) {
            tx.execute(
                "UPDATE offline_actions
                 SET status = 'failed', attempts = ?1, last_error = ?2, next_attempt_at = NULL
                 WHERE id = ?3",
                params![attempts, error, id.0],
            )?;
            FailureOutcome::DeadLettered { attempts }
        } else {
            let delay = chrono::Duration::from_std(policy.delay_for(attempts))
                .map_err(|e| Error::InvalidInput(format!("backoff out of range: {e}")))?;
            let next_attempt_at = now + delay;
            tx.execute(
                "UPDATE offline_actions
                 SET attempts = ?1, last_error = ?2, next_attempt_at = ?3
                 WHERE id = ?4",
                params![attempts, error, format_timestamp(next_attempt_at), id.0],
            )?;
            FailureOutcome::Retrying {
                attempts,
                next_attempt_at,
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Move a dead-lettered action back to pending with a fresh retry budget.
    ///
    /// Returns `false` if the action is already pending.
    pub fn requeue(&self, id: ActionId) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE offline_actions
             SET status = 'pending', attempts = 0, last_error = NULL, next_attempt_at = NULL
             WHERE id = ?1 AND status = 'failed'",
            params![id.0],
        )?;
        if affected > 0 {
            return Ok(true);
        }

        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM offline_actions WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;

        match status.as_deref().map(str::parse::<ActionStatus>).transpose()? {
            None => Err(Error::ActionNotFound(id.0)),
            Some(ActionStatus::Pending) => Ok(false),
            Some(other) => Err(Error::InvalidTransition {
                from: other.to_string(),
                to: ActionStatus::Pending.to_string(),
            }),
        }
    }

    /// Delete synced actions that were synced before `before`.
    ///
    /// Pending and failed actions are never removed.
    pub fn prune_synced(&self, before: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM offline_actions WHERE status = 'synced' AND synced_at < ?1",
            params![format_timestamp(before)],
        )?;
        Ok(affected)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
