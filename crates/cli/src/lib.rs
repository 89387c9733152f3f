// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! satchel - An offline-first action queue.
//!
//! This crate provides the `satchel` CLI: actions are recorded in a local
//! SQLite queue while the remote system of record is unreachable, and
//! replayed against it once connectivity returns.
//!
//! # Main Components
//!
//! - [`sync`] - Network monitor, dispatcher, sync coordinator and status reporter
//! - [`Config`] - Remote and retry settings, loaded from `config.toml`
//! - [`Error`] - Error types for all operations
//!
//! The queue itself ([`satchel_core::ActionStore`]) lives in `satchel-core`.
//!
//! ```rust,ignore
//! use satchel::{run, Cli};
//! use clap::Parser;
//!
//! run(Cli::parse())?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod env;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat};
pub use config::Config;
pub use error::{Error, Result};

use clap::CommandFactory;
use clap_complete::generate;

use commands::Context;

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    if let Command::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "satchel", &mut std::io::stdout());
        return Ok(());
    }

    let ctx = Context::load(cli.state_dir, cli.config)?;
    match cli.command {
        Command::Enqueue {
            kind,
            payload,
            unchecked,
        } => commands::enqueue::run(&ctx, &kind, &payload, unchecked),
        Command::List {
            status,
            limit,
            output,
        } => commands::list::run(&ctx, &status, limit, output),
        Command::Status { output } => commands::status::run(&ctx, output),
        Command::Sync { quiet } => commands::sync::run(&ctx, quiet),
        Command::Watch => commands::watch::run(&ctx),
        Command::Requeue { ids } => commands::requeue::run(&ctx, &ids),
        Command::Prune { older_than_days } => commands::prune::run(&ctx, older_than_days),
        Command::Completion { .. } => Ok(()),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
