// crates/magnet-core/tests/revalidation.rs
// ============================================================================
// Module: Revalidation Scheduler Tests
// Description: Tests for the validator re-execution priority queue.
// Purpose: Validate ordering, dedupe, removal, and callbacks.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Ensures tasks order by (priority, queued-at, validator id), each validator
//! holds at most one pending entry, and pops feed the executor and post-run
//! callbacks.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::cell::RefCell;
use std::rc::Rc;

use magnet_core::RevalidationScheduler;
use magnet_core::RevalidationTask;
use magnet_core::Timestamp;
use magnet_core::ValidatorId;

/// Builds a task with the given id, priority, and queue tick.
fn task(id: &str, priority: u32, tick: u64) -> RevalidationTask {
    RevalidationTask::new(ValidatorId::new(id), priority, Timestamp::Logical(tick))
}

/// Verifies lower priority values run first.
#[test]
fn orders_by_priority() {
    let mut scheduler = RevalidationScheduler::new();
    scheduler.schedule(task("stability/gm", 5, 1));
    scheduler.schedule(task("hull/volume", 1, 2));

    let next = scheduler.peek_next().unwrap();
    assert_eq!(next.validator_id, ValidatorId::new("hull/volume"));
}

/// Verifies equal priorities order by queue time then validator id.
#[test]
fn ties_break_by_time_then_id() {
    let mut scheduler = RevalidationScheduler::new();
    scheduler.schedule(task("b/late", 1, 9));
    scheduler.schedule(task("a/early", 1, 2));
    scheduler.schedule(task("a/also-late", 1, 9));

    let mut order = Vec::new();
    while let Some(run) = scheduler.run_next(&mut |_task: &RevalidationTask| {}) {
        order.push(run.validator_id.as_str().to_string());
    }
    assert_eq!(order, vec!["a/early", "a/also-late", "b/late"]);
}

/// Verifies a validator holds at most one pending entry.
#[test]
fn dedupes_per_validator() {
    let mut scheduler = RevalidationScheduler::new();
    assert!(scheduler.schedule(task("hull/volume", 5, 1)));
    assert!(scheduler.schedule(task("hull/volume", 1, 2)));
    assert!(!scheduler.schedule(task("hull/volume", 3, 3)));

    assert_eq!(scheduler.len(), 1);
    let executed = scheduler.run_next(&mut |_task: &RevalidationTask| {}).unwrap();
    assert_eq!(executed.priority, 1);
    assert!(scheduler.is_empty());
}

/// Verifies removal cancels the pending entry.
#[test]
fn remove_validator_cancels() {
    let mut scheduler = RevalidationScheduler::new();
    scheduler.schedule(task("hull/volume", 1, 1));
    scheduler.schedule(task("stability/gm", 2, 2));

    assert!(scheduler.remove_validator(&ValidatorId::new("hull/volume")));
    assert!(!scheduler.remove_validator(&ValidatorId::new("hull/volume")));

    let executed = scheduler.run_next(&mut |_task: &RevalidationTask| {}).unwrap();
    assert_eq!(executed.validator_id, ValidatorId::new("stability/gm"));
    assert!(scheduler.run_next(&mut |_task: &RevalidationTask| {}).is_none());
}

/// Verifies pops feed the executor and count processed tasks.
#[test]
fn run_next_feeds_executor() {
    let mut scheduler = RevalidationScheduler::new();
    scheduler.schedule(task("hull/volume", 1, 1));

    let mut executed = Vec::new();
    scheduler.run_next(&mut |run: &RevalidationTask| {
        executed.push(run.validator_id.as_str().to_string());
    });

    assert_eq!(executed, vec!["hull/volume"]);
    assert_eq!(scheduler.processed_count(), 1);
}

/// Verifies post-run callbacks fire after the executor.
#[test]
fn post_run_callbacks_fire() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let mut scheduler = RevalidationScheduler::new();
    scheduler.add_post_run_callback(Box::new(move |run: &RevalidationTask| {
        sink.borrow_mut().push(run.validator_id.as_str().to_string());
    }));

    scheduler.schedule(task("hull/volume", 1, 1));
    scheduler.schedule(task("stability/gm", 2, 2));
    scheduler.run_next(&mut |_task: &RevalidationTask| {});
    scheduler.run_next(&mut |_task: &RevalidationTask| {});

    assert_eq!(seen.borrow().as_slice(), &["hull/volume".to_string(), "stability/gm".to_string()]);
}

/// Verifies pending lists tasks in execution order and clear empties it.
#[test]
fn pending_and_clear() {
    let mut scheduler = RevalidationScheduler::new();
    scheduler.schedule(task("stability/gm", 2, 1));
    scheduler.schedule(task("hull/volume", 1, 2));

    let pending: Vec<&str> =
        scheduler.pending().into_iter().map(|run| run.validator_id.as_str()).collect();
    assert_eq!(pending, vec!["hull/volume", "stability/gm"]);

    scheduler.clear_queue();
    assert!(scheduler.is_empty());
    assert!(scheduler.peek_next().is_none());
}
