// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  satchel enqueue mark_read '{\"userId\":\"u1\",\"topicId\":\"t1\",\"materialId\":\"m1\"}'
  satchel status            Show backlog counts
  satchel sync              Deliver pending actions now
  satchel watch             Keep syncing whenever the remote is reachable";

#[derive(Parser)]
#[command(name = "satchel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first action queue that syncs to a remote system of record")]
#[command(
    long_about = "Offline-first action queue.\n\n\
    Records intended writes locally while offline and replays them against the \
    remote system of record once it is reachable again."
)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// State directory (default: $XDG_STATE_HOME/satchel)
    #[arg(long, global = true, value_name = "dir")]
    pub state_dir: Option<PathBuf>,

    /// Config file (default: <state-dir>/config.toml)
    #[arg(long, global = true, value_name = "file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Queue an action for delivery
    #[command(arg_required_else_help = true)]
    Enqueue {
        /// Action kind (quiz_submission, assignment_submission, announcement,
        /// chat_message, mark_read)
        kind: String,

        /// JSON payload, or '-' to read it from stdin
        payload: String,

        /// Store the action without validating kind or payload
        #[arg(long)]
        unchecked: bool,
    },

    /// List queued actions
    List {
        /// Status to list (pending, synced, failed)
        #[arg(long, short, default_value = "pending")]
        status: String,

        /// Show at most this many actions
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Output format
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show backlog counts
    Status {
        /// Output format
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Run one sync pass now
    Sync {
        /// Only report errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Sync whenever the remote becomes reachable, until interrupted
    Watch,

    /// Move dead-lettered actions back to pending
    #[command(arg_required_else_help = true)]
    Requeue {
        /// Action ID(s)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete synced actions older than the retention window
    Prune {
        /// Override the configured retention (days)
        #[arg(long, value_name = "days")]
        older_than_days: Option<u32>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
