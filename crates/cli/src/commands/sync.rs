// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use satchel_core::{ActionStore, RetryPolicy};

use crate::error::{Error, Result};
use crate::sync::{PassOutcome, RemoteBackend, RemoteClient, SkipReason, SyncCoordinator};

use super::{acquire_sync_lock, runtime, Context};

pub fn run(ctx: &Context, quiet: bool) -> Result<()> {
    let _lock = acquire_sync_lock(&ctx.state_dir)?;
    let store = Arc::new(ctx.open_store()?);
    let backend = RemoteClient::new(ctx.config.remote.client_config());

    let rt = runtime()?;
    let outcome = rt.block_on(run_impl(store, backend, ctx.config.sync.retry_policy()))?;

    let message = describe(&outcome, &ctx.config.remote.url)?;
    if !quiet {
        println!("{}", message);
    }
    Ok(())
}

/// Run a single manual pass.
pub(crate) async fn run_impl<B: RemoteBackend>(
    store: Arc<ActionStore>,
    backend: B,
    policy: RetryPolicy,
) -> Result<PassOutcome> {
    let coordinator = SyncCoordinator::new(store, backend, policy);
    Ok(coordinator.force_sync().await?)
}

/// User-facing line for a pass outcome. An unreachable remote is an error.
pub(crate) fn describe(outcome: &PassOutcome, url: &str) -> Result<String> {
    match outcome {
        PassOutcome::Completed(report) => Ok(report.summary()),
        PassOutcome::Skipped(SkipReason::NothingPending) => Ok("nothing to sync".to_string()),
        PassOutcome::Skipped(SkipReason::NothingDue) => {
            Ok("pending actions are backing off after failures; try again later".to_string())
        }
        PassOutcome::Skipped(SkipReason::InFlight) => {
            Ok("a sync pass is already running".to_string())
        }
        PassOutcome::Skipped(SkipReason::BackendUnavailable) => Err(Error::RemoteUnavailable {
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
