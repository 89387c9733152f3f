// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::SecondsFormat;
use satchel_core::{ActionStatus, ActionStore, OfflineAction};

use crate::cli::OutputFormat;
use crate::error::Result;

use super::Context;

pub fn run(ctx: &Context, status: &str, limit: Option<usize>, output: OutputFormat) -> Result<()> {
    let store = ctx.open_store()?;
    let status: ActionStatus = status.parse()?;
    let actions = run_impl(&store, status, limit)?;
    let rendered = render(&actions, output)?;
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
    Ok(())
}

/// Actions with `status`, oldest first, capped at `limit`.
pub(crate) fn run_impl(
    store: &ActionStore,
    status: ActionStatus,
    limit: Option<usize>,
) -> Result<Vec<OfflineAction>> {
    let mut actions = store.list_by_status(status)?;
    if let Some(limit) = limit {
        actions.truncate(limit);
    }
    Ok(actions)
}

pub(crate) fn render(actions: &[OfflineAction], output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(actions)?),
        OutputFormat::Text => Ok(actions
            .iter()
            .map(format_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// `<id>  <status>  <kind>  <created>` plus attempt and error details.
pub(crate) fn format_line(action: &OfflineAction) -> String {
    let mut line = format!(
        "{:>5}  {:<7}  {:<21}  {}",
        action.id,
        action.status,
        action.kind,
        action.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if action.attempts > 0 {
        line.push_str(&format!("  attempts={}", action.attempts));
    }
    if let Some(err) = &action.last_error {
        line.push_str(&format!("  error: {}", err));
    }
    line
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
