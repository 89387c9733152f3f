// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Duration, Utc};
use satchel_core::ActionStore;

use crate::error::Result;

use super::Context;

pub fn run(ctx: &Context, older_than_days: Option<u32>) -> Result<()> {
    let days = older_than_days.unwrap_or(ctx.config.sync.retention_days);
    let store = ctx.open_store()?;
    let removed = run_impl(&store, Duration::days(i64::from(days)), Utc::now())?;
    println!("pruned {} synced action(s)", removed);
    Ok(())
}

/// Delete actions synced more than `older_than` before `now`.
pub(crate) fn run_impl(
    store: &ActionStore,
    older_than: Duration,
    now: DateTime<Utc>,
) -> Result<usize> {
    Ok(store.prune_synced(now - older_than)?)
}

#[cfg(test)]
#[path = "prune_tests.rs"]
mod tests;
