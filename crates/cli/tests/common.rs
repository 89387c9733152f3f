// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// The satchel binary, isolated from the caller's environment.
pub fn satchel() -> Command {
    let mut cmd = cargo_bin_cmd!("satchel");
    cmd.env_remove("SATCHEL_STATE_DIR")
        .env_remove("SATCHEL_CONFIG")
        .env_remove("SATCHEL_LOG");
    cmd
}

/// The satchel binary pointed at a state directory.
pub fn satchel_in(state: &Path) -> Command {
    let mut cmd = satchel();
    cmd.arg("--state-dir").arg(state);
    cmd
}

pub const MARK_READ: &str = r#"{"userId":"u1","topicId":"t1","materialId":"m1"}"#;

/// Enqueue an action and return its id.
pub fn enqueue(state: &Path, kind: &str, payload: &str) -> String {
    let output = satchel_in(state)
        .args(["enqueue", kind, payload])
        .output()
        .unwrap();
    assert!(output.status.success(), "enqueue failed: {:?}", output);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Point the state directory's config at a remote.
pub fn write_config(state: &Path, remote_url: &str) {
    std::fs::write(
        state.join("config.toml"),
        format!(
            "[remote]\nurl = \"{remote_url}\"\nreconnect_max_retries = 1\nack_timeout_ms = 2000\n"
        ),
    )
    .unwrap();
}
