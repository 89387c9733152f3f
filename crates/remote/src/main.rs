// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! satchel-remote binary entry point.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use satchel_remote::{server, ServerState};

/// satchel-remote: system of record for offline satchel clients
#[derive(Parser, Debug)]
#[command(name = "satchel-remote")]
#[command(about = "WebSocket server that applies queued satchel writes")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the record database
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting satchel-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = ServerState::new(&args.data)?;
    server::run(args.bind, state).await?;

    Ok(())
}
