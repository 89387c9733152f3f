// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the sync coordinator.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use yare::parameterized;

use super::coordinator::{PassOutcome, PassReport, SkipReason, SyncCoordinator};
use super::network::NetworkMonitor;
use super::test_helpers::{mark_read, quiz, MockBackend};
use satchel_core::{ActionId, ActionStatus, ActionStore, ProgressKey, RetryPolicy};

fn coordinator_with(policy: RetryPolicy) -> (Arc<SyncCoordinator<MockBackend>>, MockBackend) {
    let store = Arc::new(ActionStore::open_in_memory().unwrap());
    let backend = MockBackend::new();
    let coordinator = SyncCoordinator::new(store, backend.clone(), policy);
    (Arc::new(coordinator), backend)
}

/// Coordinator whose failures are retried on the very next pass.
fn coordinator() -> (Arc<SyncCoordinator<MockBackend>>, MockBackend) {
    coordinator_with(RetryPolicy::unlimited())
}

fn completed(outcome: PassOutcome) -> PassReport {
    match outcome {
        PassOutcome::Completed(report) => report,
        other => panic!("expected a completed pass, got {other:?}"),
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[parameterized(
    one = { 1 },
    few = { 5 },
    many = { 40 },
)]
fn drains_backlog_to_zero(n: usize) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    rt.block_on(async {
        let (c, backend) = coordinator();
        let ids: Vec<ActionId> = (0..n)
            .map(|i| c.store().enqueue(&quiz(&format!("a{i}"))).unwrap())
            .collect();

        let report = completed(c.force_sync().await.unwrap());

        assert_eq!(report.attempted, n);
        assert_eq!(report.synced, n);
        assert!(report.is_clean());
        assert_eq!(c.store().count(ActionStatus::Pending).unwrap(), 0);
        for id in ids {
            assert_eq!(c.store().get(id).unwrap().status, ActionStatus::Synced);
        }
        assert_eq!(backend.row_count("submissions"), n);
    });
}

#[tokio::test]
async fn empty_backlog_is_a_no_op() {
    let (c, backend) = coordinator();

    let outcome = c.run_sync_pass().await.unwrap();

    assert_eq!(outcome, PassOutcome::Skipped(SkipReason::NothingPending));
    assert_eq!(backend.ready_calls(), 0);
    assert!(c.last_report().is_none());
}

#[parameterized(
    first = { &[0] },
    middle = { &[2] },
    last = { &[4] },
    first_and_last = { &[0, 4] },
    all = { &[0, 1, 2, 3, 4] },
)]
fn failures_are_isolated(failing: &[usize]) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    rt.block_on(async {
        let (c, backend) = coordinator();
        let ids: Vec<ActionId> = (0..5)
            .map(|i| c.store().enqueue(&quiz(&format!("a{i}"))).unwrap())
            .collect();
        for &i in failing {
            backend.reject(ids[i]);
        }

        let report = completed(c.force_sync().await.unwrap());

        let k = failing.len();
        assert_eq!(report.attempted, 5);
        assert_eq!(report.synced, 5 - k);
        assert_eq!(report.failed, k);
        assert_eq!(c.store().count(ActionStatus::Pending).unwrap(), k);
        for (i, id) in ids.iter().enumerate() {
            let action = c.store().get(*id).unwrap();
            if failing.contains(&i) {
                assert_eq!(action.status, ActionStatus::Pending);
                assert_eq!(action.attempts, 1);
                assert!(action.last_error.unwrap().contains("rejected"));
            } else {
                assert_eq!(action.status, ActionStatus::Synced);
            }
        }
    });
}

#[tokio::test]
async fn overlapping_triggers_deliver_each_action_once() {
    let (c, backend) = coordinator();
    for i in 0..3 {
        c.store().enqueue(&quiz(&format!("a{i}"))).unwrap();
    }

    let (first, second) = tokio::join!(c.force_sync(), c.force_sync());

    let first = first.unwrap();
    let second = second.unwrap();
    let skipped = [first, second]
        .iter()
        .filter(|o| **o == PassOutcome::Skipped(SkipReason::InFlight))
        .count();
    assert_eq!(skipped, 1);
    assert_eq!(backend.apply_calls(), 3);
    assert_eq!(backend.row_count("submissions"), 3);
    assert_eq!(c.store().count(ActionStatus::Synced).unwrap(), 3);
}

#[tokio::test]
async fn sequential_triggers_do_not_redeliver() {
    let (c, backend) = coordinator();
    c.store().enqueue(&quiz("a1")).unwrap();

    completed(c.force_sync().await.unwrap());
    let again = c.force_sync().await.unwrap();

    assert_eq!(again, PassOutcome::Skipped(SkipReason::NothingPending));
    assert_eq!(backend.apply_calls(), 1);
}

#[tokio::test]
async fn mark_read_replays_converge_on_one_row() {
    let (c, backend) = coordinator();
    let id = c.store().enqueue(&mark_read("m1")).unwrap();
    backend.lose_ack(id);

    // Committed remotely but the ack was lost: still pending locally
    let report = completed(c.force_sync().await.unwrap());
    assert_eq!(report.failed, 1);
    assert_eq!(c.store().get(id).unwrap().status, ActionStatus::Pending);

    // Two more copies of the same intent
    c.store().enqueue(&mark_read("m1")).unwrap();
    c.store().enqueue(&mark_read("m1")).unwrap();
    let report = completed(c.force_sync().await.unwrap());
    assert_eq!(report.synced, 3);

    assert_eq!(backend.apply_calls(), 4);
    assert_eq!(
        backend.progress_rows(),
        vec![(ProgressKey::new("u1", "t1", "m1"), true)]
    );
}

/// Replaying an insert whose ack was lost duplicates the remote row. The
/// server keeps both; `client_ref` is what a reconciliation would match on.
#[tokio::test]
async fn quiz_replay_after_lost_ack_duplicates_row() {
    let (c, backend) = coordinator();
    let id = c.store().enqueue(&quiz("a1")).unwrap();
    backend.lose_ack(id);

    let report = completed(c.force_sync().await.unwrap());
    assert_eq!(report.synced, 0);
    assert_eq!(report.failed, 1);

    let report = completed(c.force_sync().await.unwrap());
    assert_eq!(report.synced, 1);

    assert_eq!(backend.row_count("submissions"), 2);
    assert_eq!(backend.submission_refs("a1"), vec![Some(id), Some(id)]);
    assert_eq!(c.store().get(id).unwrap().status, ActionStatus::Synced);
}

#[tokio::test]
async fn unknown_kind_stays_pending_forever() {
    let (c, backend) = coordinator();
    let unknown = c
        .store()
        .enqueue_raw("grade_override", &json!({"grade": "A+"}))
        .unwrap();
    let known = c.store().enqueue(&mark_read("m1")).unwrap();

    for _ in 0..3 {
        let report = completed(c.run_sync_pass().await.unwrap());
        assert_eq!(report.unknown, 1);
    }

    let action = c.store().get(unknown).unwrap();
    assert_eq!(action.status, ActionStatus::Pending);
    assert_eq!(action.attempts, 0);
    assert_eq!(c.store().get(known).unwrap().status, ActionStatus::Synced);
    assert_eq!(backend.apply_calls(), 1);
}

#[tokio::test]
async fn malformed_payload_consumes_retry_budget() {
    let (c, backend) = coordinator();
    let id = c
        .store()
        .enqueue_raw("mark_read", &json!({"userId": "u1"}))
        .unwrap();

    let report = completed(c.run_sync_pass().await.unwrap());

    assert_eq!(report.failed, 1);
    let action = c.store().get(id).unwrap();
    assert_eq!(action.attempts, 1);
    assert!(action.last_error.unwrap().contains("malformed"));
    assert_eq!(backend.apply_calls(), 0);
}

#[tokio::test]
async fn exhausted_actions_are_dead_lettered() {
    let (c, backend) = coordinator_with(RetryPolicy {
        max_attempts: 2,
        ..RetryPolicy::unlimited()
    });
    let id = c.store().enqueue(&quiz("a1")).unwrap();
    backend.reject(id);

    let report = completed(c.run_sync_pass().await.unwrap());
    assert_eq!(report.failed, 1);
    let report = completed(c.run_sync_pass().await.unwrap());
    assert_eq!(report.dead_lettered, 1);
    assert_eq!(report.summary(), "synced 0 items (1 failed permanently)");

    assert_eq!(c.store().get(id).unwrap().status, ActionStatus::Failed);
    assert_eq!(
        c.run_sync_pass().await.unwrap(),
        PassOutcome::Skipped(SkipReason::NothingPending)
    );

    // Manual requeue puts it back in the next pass
    backend.accept(id);
    assert!(c.store().requeue(id).unwrap());
    let report = completed(c.run_sync_pass().await.unwrap());
    assert_eq!(report.synced, 1);
}

#[tokio::test]
async fn failed_actions_back_off() {
    let (c, backend) = coordinator_with(RetryPolicy::default());
    let id = c.store().enqueue(&quiz("a1")).unwrap();
    backend.reject(id);

    completed(c.run_sync_pass().await.unwrap());
    let outcome = c.run_sync_pass().await.unwrap();

    assert_eq!(outcome, PassOutcome::Skipped(SkipReason::NothingDue));
    assert_eq!(backend.apply_calls(), 1);
    assert!(c.store().get(id).unwrap().next_attempt_at.is_some());
}

#[tokio::test]
async fn unavailable_backend_skips_without_burning_attempts() {
    let (c, backend) = coordinator();
    let id = c.store().enqueue(&quiz("a1")).unwrap();
    backend.set_unavailable(true);

    let outcome = c.run_sync_pass().await.unwrap();

    assert_eq!(outcome, PassOutcome::Skipped(SkipReason::BackendUnavailable));
    assert!(!c.is_syncing());
    assert_eq!(c.store().get(id).unwrap().attempts, 0);

    backend.set_unavailable(false);
    let report = completed(c.run_sync_pass().await.unwrap());
    assert_eq!(report.synced, 1);
}

#[tokio::test]
async fn dropped_link_defers_rest_of_pass_without_burning_attempts() {
    let policy = RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    };
    let (c, backend) = coordinator_with(policy);
    let first = c.store().enqueue(&mark_read("m1")).unwrap();
    let second = c.store().enqueue(&mark_read("m2")).unwrap();
    let third = c.store().enqueue(&mark_read("m3")).unwrap();
    backend.drop_link_after(1);

    let report = completed(c.run_sync_pass().await.unwrap());
    assert_eq!(report.attempted, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.dead_lettered, 0);
    assert_eq!(report.deferred, 2);
    assert_eq!(report.summary(), "synced 1 item (2 deferred, connection lost)");
    assert_eq!(backend.apply_calls(), 2);

    assert_eq!(c.store().get(first).unwrap().status, ActionStatus::Synced);
    for id in [second, third] {
        let action = c.store().get(id).unwrap();
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.attempts, 0);
        assert!(action.next_attempt_at.is_none());
    }

    // The reconnect pass delivers the rest immediately.
    backend.restore_link();
    let report = completed(c.run_sync_pass().await.unwrap());
    assert_eq!(report.synced, 2);
    assert_eq!(c.store().count(ActionStatus::Pending).unwrap(), 0);
    assert_eq!(c.store().count(ActionStatus::Failed).unwrap(), 0);
}

#[tokio::test]
async fn repeated_link_drops_never_dead_letter() {
    let policy = RetryPolicy {
        max_attempts: 2,
        ..RetryPolicy::default()
    };
    let (c, backend) = coordinator_with(policy);
    let id = c.store().enqueue(&quiz("a1")).unwrap();
    backend.drop_link_after(0);

    for _ in 0..5 {
        let report = completed(c.run_sync_pass().await.unwrap());
        assert_eq!(report.deferred, 1);
    }

    let action = c.store().get(id).unwrap();
    assert_eq!(action.status, ActionStatus::Pending);
    assert_eq!(action.attempts, 0);
}

#[tokio::test]
async fn actions_enqueued_mid_pass_wait_for_next_pass() {
    let (c, backend) = coordinator();
    c.store().enqueue(&quiz("a1")).unwrap();
    c.store().enqueue(&quiz("a2")).unwrap();

    let store = Arc::clone(c.store());
    let watcher = backend.clone();
    let (outcome, late) = tokio::join!(c.force_sync(), async move {
        while watcher.apply_calls() == 0 {
            tokio::task::yield_now().await;
        }
        store.enqueue(&quiz("late")).unwrap()
    });

    let report = completed(outcome.unwrap());
    assert_eq!(report.attempted, 2);
    assert_eq!(c.store().get(late).unwrap().status, ActionStatus::Pending);

    let report = completed(c.force_sync().await.unwrap());
    assert_eq!(report.attempted, 1);
    assert_eq!(backend.submission_refs("late"), vec![Some(late)]);
}

#[tokio::test]
async fn syncing_flag_tracks_pass() {
    let (c, _backend) = coordinator();
    c.store().enqueue(&quiz("a1")).unwrap();
    let mut syncing = c.subscribe();
    assert!(!*syncing.borrow_and_update());

    let pass = c.force_sync();
    let observe = async {
        syncing.changed().await.unwrap();
        *syncing.borrow_and_update()
    };
    let (outcome, seen) = tokio::join!(pass, observe);

    completed(outcome.unwrap());
    assert!(seen);
    assert!(!c.is_syncing());
}

#[tokio::test]
async fn completed_pass_publishes_report() {
    let (c, backend) = coordinator();
    let bad = c.store().enqueue(&quiz("a1")).unwrap();
    c.store().enqueue(&quiz("a2")).unwrap();
    backend.reject(bad);

    completed(c.force_sync().await.unwrap());

    let report = c.last_report().unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 1);
    assert!(!report.is_clean());
    assert_eq!(report.summary(), "synced 1 item (1 will retry)");
}

#[test]
fn summary_counts_items() {
    let report = PassReport {
        attempted: 4,
        synced: 3,
        failed: 0,
        dead_lettered: 0,
        unknown: 1,
        deferred: 0,
    };
    assert_eq!(report.summary(), "synced 3 items (1 of unknown kind)");
    assert_eq!(PassReport::default().summary(), "synced 0 items");
}

#[tokio::test]
async fn going_online_drains_offline_mark_read() {
    let (c, backend) = coordinator();
    let (monitor, reconnects) = NetworkMonitor::new(false);

    c.store()
        .enqueue_raw(
            "mark_read",
            &json!({"userId": "u1", "topicId": "t1", "materialId": "m1"}),
        )
        .unwrap();
    assert_eq!(c.store().count(ActionStatus::Pending).unwrap(), 1);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Arc::clone(&c).run(
        reconnects,
        monitor.subscribe(),
        None,
        cancel.clone(),
    ));

    // Nothing happens while offline
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(backend.apply_calls(), 0);

    monitor.observe(true);
    let store = Arc::clone(c.store());
    wait_until(|| store.count(ActionStatus::Pending).unwrap() == 0).await;

    assert_eq!(
        backend.progress_rows(),
        vec![(ProgressKey::new("u1", "t1", "m1"), true)]
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn retry_timer_drains_while_online() {
    let (c, backend) = coordinator();
    let id = c.store().enqueue(&quiz("a1")).unwrap();
    let (_monitor, reconnects) = NetworkMonitor::new(true);
    let (_online_tx, online) = watch::channel(true);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Arc::clone(&c).run(
        reconnects,
        online,
        Some(Duration::from_millis(10)),
        cancel.clone(),
    ));

    let store = Arc::clone(c.store());
    wait_until(|| store.get(id).unwrap().status == ActionStatus::Synced).await;
    assert_eq!(backend.apply_calls(), 1);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn retry_timer_is_idle_while_offline() {
    let (c, backend) = coordinator();
    c.store().enqueue(&quiz("a1")).unwrap();
    let (_monitor, reconnects) = NetworkMonitor::new(false);
    let (_online_tx, online) = watch::channel(false);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Arc::clone(&c).run(
        reconnects,
        online,
        Some(Duration::from_millis(5)),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.ready_calls(), 0);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn run_stops_when_reconnect_channel_closes() {
    let (c, _backend) = coordinator();
    let (monitor, reconnects) = NetworkMonitor::new(false);
    let online = monitor.subscribe();
    drop(monitor);

    let handle = tokio::spawn(Arc::clone(&c).run(
        reconnects,
        online,
        None,
        CancellationToken::new(),
    ));

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
