// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use crate::error::Error;
use chrono::Utc;
use satchel_core::{ActionStatus, RetryPolicy};

fn dead_letter(tc: &TestContext, material: &str) -> ActionId {
    let id = tc.mark_read(material);
    let policy = RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    };
    tc.store
        .record_failure(id, "rejected", &policy, Utc::now())
        .unwrap();
    id
}

#[test]
fn test_requeue_failed_action() {
    let tc = TestContext::new();
    let id = dead_letter(&tc, "m1");

    let results = run_impl(&tc.store, &[id]).unwrap();
    assert_eq!(results, vec![(id, true)]);

    let action = tc.store.get(id).unwrap();
    assert_eq!(action.status, ActionStatus::Pending);
    assert_eq!(action.attempts, 0);
    assert!(action.last_error.is_none());
}

#[test]
fn test_requeue_pending_is_noop() {
    let tc = TestContext::new();
    let id = tc.mark_read("m1");

    assert_eq!(run_impl(&tc.store, &[id]).unwrap(), vec![(id, false)]);
}

#[test]
fn test_requeue_synced_is_rejected() {
    let tc = TestContext::new();
    let id = tc.mark_read("m1");
    tc.store.mark_synced(id).unwrap();

    let err = run_impl(&tc.store, &[id]).unwrap_err();
    assert!(matches!(
        err,
        Error::Core(satchel_core::Error::InvalidTransition { .. })
    ));
}

#[test]
fn test_requeue_unknown_id() {
    let tc = TestContext::new();
    let err = run_impl(&tc.store, &[ActionId(42)]).unwrap_err();
    assert!(matches!(
        err,
        Error::Core(satchel_core::Error::ActionNotFound(42))
    ));
}

#[test]
fn test_requeue_several() {
    let tc = TestContext::new();
    let a = dead_letter(&tc, "m1");
    let b = dead_letter(&tc, "m2");

    run_impl(&tc.store, &[a, b]).unwrap();
    assert_eq!(tc.store.count(ActionStatus::Failed).unwrap(), 0);
    assert_eq!(tc.store.count(ActionStatus::Pending).unwrap(), 2);
}
