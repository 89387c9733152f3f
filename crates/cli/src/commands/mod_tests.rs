// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Test infrastructure for command testing.
//!
//! `TestContext` wraps a temporary state directory, a default config and
//! the store inside it, so commands can be exercised without touching the
//! user's real state.

use super::{acquire_sync_lock, Context};
use crate::config::Config;
use crate::error::Error;
use satchel_core::{Action, ActionId, ActionStore, ProgressKey};
use tempfile::TempDir;

/// Test context with a throwaway state directory.
pub struct TestContext {
    pub ctx: Context,
    pub store: ActionStore,
    _temp_dir: TempDir, // Keep alive for duration of test
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let ctx = Context {
            state_dir: temp_dir.path().to_path_buf(),
            config: Config::default(),
        };
        let store = ctx.open_store().expect("Failed to open store");
        TestContext {
            ctx,
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Queue a mark_read for user u1, topic t1.
    pub fn mark_read(&self, material: &str) -> ActionId {
        self.store
            .enqueue(&Action::MarkRead(ProgressKey::new("u1", "t1", material)))
            .unwrap()
    }
}

#[test]
fn test_context_load_uses_state_dir_config() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        "[remote]\nurl = \"ws://example.edu:9000\"\n",
    )
    .unwrap();

    let ctx = Context::load(Some(temp.path().to_path_buf()), None).unwrap();
    assert_eq!(ctx.state_dir, temp.path());
    assert_eq!(ctx.config.remote.url, "ws://example.edu:9000");
}

#[test]
fn test_context_load_explicit_config() {
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("other.toml");
    std::fs::write(&config_file, "[sync]\nmax_attempts = 2\n").unwrap();

    let ctx = Context::load(Some(temp.path().to_path_buf()), Some(config_file)).unwrap();
    assert_eq!(ctx.config.sync.max_attempts, 2);
}

#[test]
fn test_open_store_creates_state_dir() {
    let temp = TempDir::new().unwrap();
    let ctx = Context {
        state_dir: temp.path().join("deep").join("state"),
        config: Config::default(),
    };
    ctx.open_store().unwrap();
    assert!(ctx.state_dir.join("actions.db").exists());
}

#[test]
fn test_sync_lock_is_exclusive() {
    let temp = TempDir::new().unwrap();
    let first = acquire_sync_lock(temp.path()).unwrap();

    let err = acquire_sync_lock(temp.path()).unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning(_)));

    drop(first);
    acquire_sync_lock(temp.path()).unwrap();
}
