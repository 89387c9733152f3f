// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

use crate::sync::SyncError;

/// All possible errors that can occur in the satchel CLI.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] satchel_core::Error),

    #[error("{0}\n  hint: pass --unchecked to queue it anyway")]
    InvalidAction(#[from] satchel_core::DecodeError),

    #[error("invalid payload: {0}\n  hint: the payload must be a JSON object")]
    InvalidPayload(String),

    #[error("remote error: {0}")]
    Sync(#[from] SyncError),

    #[error("cannot reach remote at {url}\n  hint: check [remote] url in the config file")]
    RemoteUnavailable { url: String },

    #[error("another satchel sync or watch is running (lock: {})", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// A specialized Result type for satchel CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
