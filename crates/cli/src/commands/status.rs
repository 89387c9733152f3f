// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use satchel_core::ActionStore;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;

use super::Context;

/// Queue totals as shown by `satchel status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct QueueStatus {
    pub pending: usize,
    pub synced: usize,
    pub failed: usize,
    pub remote: String,
}

pub fn run(ctx: &Context, output: OutputFormat) -> Result<()> {
    let store = ctx.open_store()?;
    let status = run_impl(&store, &ctx.config.remote.url)?;
    println!("{}", render(&status, output)?);
    Ok(())
}

pub(crate) fn run_impl(store: &ActionStore, remote: &str) -> Result<QueueStatus> {
    let counts = store.counts()?;
    Ok(QueueStatus {
        pending: counts.pending,
        synced: counts.synced,
        failed: counts.failed,
        remote: remote.to_string(),
    })
}

pub(crate) fn render(status: &QueueStatus, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
        OutputFormat::Text => {
            let mut text = format!(
                "pending: {}\nsynced:  {}\nfailed:  {}\nremote:  {}",
                status.pending, status.synced, status.failed, status.remote
            );
            if status.failed > 0 {
                text.push_str("\n\nFailed actions need `satchel requeue <id>` to retry.");
            }
            Ok(text)
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
