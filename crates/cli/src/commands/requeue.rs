// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use satchel_core::{ActionId, ActionStore};

use crate::error::Result;

use super::Context;

pub fn run(ctx: &Context, ids: &[String]) -> Result<()> {
    let ids = ids
        .iter()
        .map(|id| id.parse::<ActionId>())
        .collect::<satchel_core::Result<Vec<_>>>()?;

    let store = ctx.open_store()?;
    for (id, requeued) in run_impl(&store, &ids)? {
        if requeued {
            println!("requeued {}", id);
        } else {
            println!("{} is already pending", id);
        }
    }
    Ok(())
}

/// Move failed actions back to pending. Stops at the first error.
pub(crate) fn run_impl(store: &ActionStore, ids: &[ActionId]) -> Result<Vec<(ActionId, bool)>> {
    let mut results = Vec::with_capacity(ids.len());
    for &id in ids {
        results.push((id, store.requeue(id)?));
    }
    Ok(results)
}

#[cfg(test)]
#[path = "requeue_tests.rs"]
mod tests;
