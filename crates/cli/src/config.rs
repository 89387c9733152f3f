// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration and state directory layout.
//!
//! Configuration is read from `config.toml` in the state directory (or an
//! explicit path). Every field has a default, so a missing file is the same
//! as an empty one:
//!
//! ```toml
//! [remote]
//! url = "ws://localhost:7890"
//! ack_timeout_ms = 10000
//!
//! [sync]
//! max_attempts = 10
//! retry_interval_secs = 60
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use satchel_core::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::{Error, Result};
use crate::sync::ClientConfig;

const STATE_DIR_NAME: &str = "satchel";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "actions.db";
const LOCK_FILE_NAME: &str = "sync.lock";

/// Client configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Where the remote lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL of the satchel-remote server.
    #[serde(default = "default_url")]
    pub url: String,
    /// Maximum connection attempts per sync pass (0 = unlimited).
    #[serde(default = "default_reconnect_max_retries")]
    pub reconnect_max_retries: u32,
    /// Maximum delay between connection attempts in seconds.
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    /// Initial reconnect backoff in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// How long to wait for a write acknowledgment in milliseconds.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Connectivity check interval in milliseconds.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Connectivity check timeout in milliseconds.
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
}

/// Retry, polling and retention settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Failed attempts before an action is dead-lettered (0 = never).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Periodic retry while online, in seconds (0 = only on reconnect).
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    /// Status poll interval in milliseconds.
    #[serde(default = "default_status_poll_ms")]
    pub status_poll_ms: u64,
    /// Days to keep synced actions (0 = keep forever).
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_reconnect_max_retries() -> u32 {
    3
}

fn default_reconnect_max_delay_secs() -> u64 {
    30
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_ack_timeout_ms() -> u64 {
    10_000
}

fn default_check_interval_ms() -> u64 {
    5_000
}

fn default_check_timeout_ms() -> u64 {
    2_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_secs() -> u64 {
    300
}

fn default_retry_interval_secs() -> u64 {
    60
}

fn default_status_poll_ms() -> u64 {
    1_000
}

fn default_retention_days() -> u32 {
    7
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: default_url(),
            reconnect_max_retries: default_reconnect_max_retries(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            initial_delay_ms: default_initial_delay_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            check_interval_ms: default_check_interval_ms(),
            check_timeout_ms: default_check_timeout_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            status_poll_ms: default_status_poll_ms(),
            retention_days: default_retention_days(),
        }
    }
}

impl RemoteConfig {
    /// Returns an error message if the URL is not a WebSocket URL.
    pub fn validate_url(&self) -> Option<String> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            None
        } else {
            Some(format!(
                "invalid remote URL '{}': must start with ws:// or wss://",
                self.url
            ))
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.url.clone(),
            max_retries: self.reconnect_max_retries,
            max_delay_secs: self.reconnect_max_delay_secs,
            initial_delay_ms: self.initial_delay_ms,
            ack_timeout_ms: self.ack_timeout_ms,
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

impl SyncConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }

    pub fn retry_interval(&self) -> Option<Duration> {
        (self.retry_interval_secs > 0).then(|| Duration::from_secs(self.retry_interval_secs))
    }

    pub fn status_poll(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }

    /// How long synced actions are kept, if pruning is enabled.
    pub fn retention(&self) -> Option<chrono::Duration> {
        (self.retention_days > 0).then(|| chrono::Duration::days(i64::from(self.retention_days)))
    }
}

impl Config {
    /// Loads configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parses and validates TOML configuration.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(msg) = self.remote.validate_url() {
            return Err(Error::Config(msg));
        }
        if self.remote.check_interval_ms == 0 {
            return Err(Error::Config("remote.check_interval_ms must be positive".into()));
        }
        if self.sync.status_poll_ms == 0 {
            return Err(Error::Config("sync.status_poll_ms must be positive".into()));
        }
        Ok(())
    }

    /// Saves configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

/// Resolve the state directory.
///
/// Order: explicit path, `SATCHEL_STATE_DIR`, `$XDG_STATE_HOME/satchel`,
/// `~/.local/state/satchel`.
pub fn state_dir(explicit: Option<PathBuf>) -> PathBuf {
    resolve_state_dir(
        explicit,
        env::state_dir(),
        env::xdg_state_home(),
        dirs::home_dir(),
    )
}

/// Pure form of [`state_dir`].
pub fn resolve_state_dir(
    explicit: Option<PathBuf>,
    env_dir: Option<PathBuf>,
    xdg_state_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit.or(env_dir) {
        return dir;
    }
    if let Some(dir) = xdg_state_home {
        return dir.join(STATE_DIR_NAME);
    }
    home.map(|h| h.join(".local/state").join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".local/state").join(STATE_DIR_NAME))
}

/// Config file path: explicit, `SATCHEL_CONFIG`, or `config.toml` in the state dir.
pub fn config_path(state_dir: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(env::config_path)
        .unwrap_or_else(|| state_dir.join(CONFIG_FILE_NAME))
}

pub fn db_path(state_dir: &Path) -> PathBuf {
    state_dir.join(DB_FILE_NAME)
}

/// Lock held by whichever process is delivering actions.
pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
