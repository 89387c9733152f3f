// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical record tables.
//!
//! Inserts are plain inserts: replaying the same submission creates a second
//! row. Progress is the only upsert, keyed by (user, topic, material).

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use satchel_core::protocol::RemoteWrite;
use satchel_core::{ActionId, ProgressKey, Result};

/// SQL schema for the record tables.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL CHECK (source IN ('quiz', 'assignment')),
    assignment_id TEXT NOT NULL CHECK (length(assignment_id) > 0),
    student_id TEXT NOT NULL CHECK (length(student_id) > 0),
    score REAL,
    max_score REAL,
    answers TEXT,
    file_url TEXT,
    client_ref INTEGER,
    received_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS announcements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    class_id TEXT NOT NULL CHECK (length(class_id) > 0),
    author_id TEXT NOT NULL CHECK (length(author_id) > 0),
    title TEXT NOT NULL CHECK (length(title) > 0),
    message TEXT NOT NULL,
    client_ref INTEGER,
    received_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL CHECK (length(session_id) > 0),
    role TEXT NOT NULL,
    content TEXT NOT NULL CHECK (length(content) > 0),
    client_ref INTEGER,
    received_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS progress (
    user_id TEXT NOT NULL CHECK (length(user_id) > 0),
    topic_id TEXT NOT NULL CHECK (length(topic_id) > 0),
    material_id TEXT NOT NULL CHECK (length(material_id) > 0),
    completed INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, topic_id, material_id)
);

CREATE INDEX IF NOT EXISTS idx_submissions_assignment ON submissions(assignment_id);
"#;

/// Tables a write can land in.
pub const TABLES: [&str; 4] = ["submissions", "announcements", "chat_messages", "progress"];

/// A row of the progress table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRow {
    pub user_id: String,
    pub topic_id: String,
    pub material_id: String,
    pub completed: bool,
}

/// A row of the submissions table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRow {
    pub id: i64,
    pub source: String,
    pub assignment_id: String,
    pub student_id: String,
    pub score: Option<f64>,
    pub client_ref: Option<i64>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The system of record.
pub struct RecordDb {
    conn: Connection,
}

impl RecordDb {
    /// Open the record database at the given path, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(RecordDb { conn })
    }

    /// Open an in-memory record database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(RecordDb { conn })
    }

    /// Apply a remote write and return the affected row id.
    pub fn apply(&self, client_ref: Option<ActionId>, write: &RemoteWrite) -> Result<i64> {
        let client_ref = client_ref.map(|id| id.0);
        match write {
            RemoteWrite::InsertSubmission { source, record } => {
                let answers = if record.answers.is_null() {
                    None
                } else {
                    Some(serde_json::to_string(&record.answers)?)
                };
                self.conn.execute(
                    "INSERT INTO submissions
                        (source, assignment_id, student_id, score, max_score, answers,
                         file_url, client_ref, received_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        source.as_str(),
                        record.assignment_id,
                        record.student_id,
                        record.score,
                        record.max_score,
                        answers,
                        record.file_url,
                        client_ref,
                        now(),
                    ],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            RemoteWrite::InsertAnnouncement { record } => {
                self.conn.execute(
                    "INSERT INTO announcements
                        (class_id, author_id, title, message, client_ref, received_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.class_id,
                        record.author_id,
                        record.title,
                        record.message,
                        client_ref,
                        now(),
                    ],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            RemoteWrite::InsertChatMessage { record } => {
                self.conn.execute(
                    "INSERT INTO chat_messages (session_id, role, content, client_ref, received_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.session_id,
                        record.role.as_str(),
                        record.content,
                        client_ref,
                        now(),
                    ],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            RemoteWrite::UpsertProgress { key, completed } => {
                let row_id = self.conn.query_row(
                    "INSERT INTO progress (user_id, topic_id, material_id, completed, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (user_id, topic_id, material_id)
                     DO UPDATE SET completed = excluded.completed, updated_at = excluded.updated_at
                     RETURNING rowid",
                    params![key.user_id, key.topic_id, key.material_id, completed, now()],
                    |row| row.get(0),
                )?;
                Ok(row_id)
            }
        }
    }

    /// Number of rows in one of [`TABLES`].
    pub fn count(&self, table: &str) -> Result<usize> {
        if !TABLES.contains(&table) {
            return Err(satchel_core::Error::InvalidInput(format!(
                "unknown table: '{table}'"
            )));
        }
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        usize::try_from(n)
            .map_err(|_| satchel_core::Error::CorruptedData(format!("negative count {n}")))
    }

    /// Look up the progress row for a key.
    pub fn progress(&self, key: &ProgressKey) -> Result<Option<ProgressRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, topic_id, material_id, completed FROM progress
                 WHERE user_id = ?1 AND topic_id = ?2 AND material_id = ?3",
                params![key.user_id, key.topic_id, key.material_id],
                |row| {
                    Ok(ProgressRow {
                        user_id: row.get(0)?,
                        topic_id: row.get(1)?,
                        material_id: row.get(2)?,
                        completed: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// All submissions for an assignment, oldest first.
    pub fn submissions_for(&self, assignment_id: &str) -> Result<Vec<SubmissionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, assignment_id, student_id, score, client_ref
             FROM submissions WHERE assignment_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![assignment_id], |row| {
                Ok(SubmissionRow {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    assignment_id: row.get(2)?,
                    student_id: row.get(3)?,
                    score: row.get(4)?,
                    client_ref: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
