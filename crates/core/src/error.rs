// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for satchel-core operations.

use thiserror::Error;

/// All possible errors that can occur in satchel-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("action not found: {0}")]
    ActionNotFound(i64),

    #[error("invalid action kind: '{0}'\n  hint: valid kinds are: quiz_submission, assignment_submission, announcement, chat_message, mark_read")]
    InvalidKind(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: pending, synced, failed")]
    InvalidStatus(String),

    #[error("invalid status transition: cannot go from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("action store lock poisoned")]
    StorePoisoned,
}

/// A specialized Result type for satchel-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
