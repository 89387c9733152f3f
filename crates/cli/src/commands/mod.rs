// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod enqueue;
pub mod list;
pub mod prune;
pub mod requeue;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
pub mod watch;

use std::fs;
use std::path::{Path, PathBuf};

use satchel_core::ActionStore;

use crate::config::{self, Config};
use crate::error::{Error, Result};

/// Resolved state directory and configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub state_dir: PathBuf,
    pub config: Config,
}

impl Context {
    /// Resolve the state directory and load its configuration.
    pub fn load(state_dir: Option<PathBuf>, config_file: Option<PathBuf>) -> Result<Self> {
        let state_dir = config::state_dir(state_dir);
        let config = Config::load(&config::config_path(&state_dir, config_file))?;
        Ok(Context { state_dir, config })
    }

    /// Open the action store, creating it on first use.
    pub fn open_store(&self) -> Result<ActionStore> {
        Ok(ActionStore::open(&config::db_path(&self.state_dir))?)
    }
}

/// Take the delivery lock so only one process sends actions at a time.
///
/// The lock is released when the returned file is dropped.
pub fn acquire_sync_lock(state_dir: &Path) -> Result<fs::File> {
    use fs2::FileExt;

    fs::create_dir_all(state_dir)?;
    let lock_path = config::lock_path(state_dir);
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| Error::AlreadyRunning(lock_path))?;
    Ok(file)
}

/// Create the tokio runtime used by the network commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))
}
