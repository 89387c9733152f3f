// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;

use satchel_core::{Action, ActionId, ActionStore};
use serde_json::Value;

use crate::error::{Error, Result};

use super::Context;

pub fn run(ctx: &Context, kind: &str, payload: &str, unchecked: bool) -> Result<()> {
    let payload = if payload == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        payload.to_string()
    };

    let store = ctx.open_store()?;
    let id = run_impl(&store, kind, &parse_payload(&payload)?, unchecked)?;
    println!("{}", id);
    Ok(())
}

/// Parse a payload argument. It must be a JSON object.
pub(crate) fn parse_payload(raw: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| Error::InvalidPayload(e.to_string()))?;
    if !value.is_object() {
        return Err(Error::InvalidPayload(format!(
            "expected an object, got {}",
            json_type(&value)
        )));
    }
    Ok(value)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn run_impl(
    store: &ActionStore,
    kind: &str,
    payload: &Value,
    unchecked: bool,
) -> Result<ActionId> {
    if unchecked {
        return Ok(store.enqueue_raw(kind, payload)?);
    }
    let action = Action::decode(kind, payload)?;
    Ok(store.enqueue(&action)?)
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
