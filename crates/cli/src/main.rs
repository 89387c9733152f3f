// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use satchel::{Cli, Command};
use tracing_subscriber::EnvFilter;

/// Log to stderr. `watch` defaults to `info`, everything else to `warn`.
fn setup_logging(command: &Command) {
    let default = match command {
        Command::Watch => "info",
        _ => "warn",
    };
    let filter = satchel::env::log_filter()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.command);
    if let Err(e) = satchel::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
