// crates/magnet-core/tests/transactions.rs
// ============================================================================
// Module: Transaction Manager Tests
// Description: Tests for snapshot-backed transactions over the design state.
// Purpose: Validate the single-writer rule and rollback byte-identity.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Ensures begin/rollback restores the exact pre-transaction state, commit
//! keeps writes visible, double begin fails, and the guard rolls back on
//! drop.

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

use magnet_core::DesignState;
use magnet_core::IsolationLevel;
use magnet_core::ParamPath;
use magnet_core::TransactionGuard;
use magnet_core::TransactionManager;
use magnet_core::Value;
use magnet_core::state::TransactionError;
use magnet_core::state::TransactionState;

/// Builds a state with one committed hull value.
fn seeded_state() -> DesignState {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();
    state
}

/// Verifies begin then rollback restores the exact pre-begin state.
#[test]
fn rollback_restores_pre_begin_state() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();
    let before = state.canonical_json().unwrap();

    let txn = manager
        .begin(&state, "test", "tentative widen", IsolationLevel::default())
        .unwrap();
    state.set(&ParamPath::new("hull.beam"), Value::Float(7.5), "test").unwrap();
    state.set(&ParamPath::new("hull.depth"), Value::Float(3.2), "test").unwrap();
    manager.rollback(&mut state, Some(&txn)).unwrap();

    assert_eq!(state.canonical_json().unwrap(), before);
    assert!(!manager.is_active());
}

/// Verifies committed writes stay visible.
#[test]
fn commit_keeps_writes() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();

    let txn = manager.begin(&state, "test", "widen", IsolationLevel::default()).unwrap();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.5), "test").unwrap();
    manager.commit(&state, Some(&txn)).unwrap();

    assert_eq!(state.get(&ParamPath::new("hull.beam")), Some(&Value::Float(6.5)));
    let record = manager.transaction(&txn).unwrap();
    assert_eq!(record.state, TransactionState::Committed);
    assert!(record.completed_at.is_some());
}

/// Verifies a second begin without commit or rollback is rejected.
#[test]
fn double_begin_is_rejected() {
    let state = seeded_state();
    let mut manager = TransactionManager::new();

    manager.begin(&state, "test", "first", IsolationLevel::default()).unwrap();
    let second = manager.begin(&state, "test", "second", IsolationLevel::default());

    assert!(matches!(second, Err(TransactionError::AlreadyActive(_))));
}

/// Verifies record_change keeps the original old value across updates.
#[test]
fn record_change_keeps_first_old_value() {
    let state = seeded_state();
    let mut manager = TransactionManager::new();
    let txn = manager.begin(&state, "test", "changes", IsolationLevel::default()).unwrap();

    let path = ParamPath::new("hull.beam");
    manager.record_change(&path, Value::Float(6.0), Value::Float(6.5));
    manager.record_change(&path, Value::Float(6.5), Value::Float(7.0));

    let record = manager.transaction(&txn).unwrap();
    let change = record.changes.get(&path).unwrap();
    assert_eq!(change.old, Value::Float(6.0));
    assert_eq!(change.new, Value::Float(7.0));
}

/// Verifies commit on a finished transaction is rejected.
#[test]
fn commit_after_rollback_is_rejected() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();
    let txn = manager.begin(&state, "test", "oops", IsolationLevel::default()).unwrap();
    manager.rollback(&mut state, Some(&txn)).unwrap();

    let result = manager.commit(&state, Some(&txn));
    assert!(matches!(result, Err(TransactionError::NotActive { .. })));
}

/// Verifies operations with no active transaction and no name fail.
#[test]
fn operations_require_a_transaction() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();
    let result = manager.rollback(&mut state, None);
    assert!(matches!(result, Err(TransactionError::NoActiveTransaction)));
}

/// Verifies the guard rolls back when dropped without commit.
#[test]
fn guard_rolls_back_on_drop() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();
    let before = state.canonical_json().unwrap();

    {
        let mut guard = TransactionGuard::begin(
            &mut manager,
            &mut state,
            "test",
            "dropped",
            IsolationLevel::default(),
        )
        .unwrap();
        guard
            .state_mut()
            .set(&ParamPath::new("hull.beam"), Value::Float(9.0), "test")
            .unwrap();
    }

    assert_eq!(state.canonical_json().unwrap(), before);
    assert!(!manager.is_active());
}

/// Verifies the guard keeps writes when committed.
#[test]
fn guard_commit_keeps_writes() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();

    let mut guard = TransactionGuard::begin(
        &mut manager,
        &mut state,
        "test",
        "kept",
        IsolationLevel::default(),
    )
    .unwrap();
    guard
        .state_mut()
        .set(&ParamPath::new("hull.beam"), Value::Float(6.5), "test")
        .unwrap();
    guard.commit().unwrap();

    assert_eq!(state.get(&ParamPath::new("hull.beam")), Some(&Value::Float(6.5)));
}

/// Verifies clear_history retains the active transaction when asked.
#[test]
fn clear_history_keeps_active() {
    let mut state = seeded_state();
    let mut manager = TransactionManager::new();

    let first = manager.begin(&state, "test", "first", IsolationLevel::default()).unwrap();
    manager.commit(&state, Some(&first)).unwrap();
    let second = manager.begin(&state, "test", "second", IsolationLevel::default()).unwrap();

    manager.clear_history(true);
    assert!(manager.transaction(&first).is_none());
    assert!(manager.transaction(&second).is_some());
    assert!(manager.is_active());

    manager.rollback(&mut state, None).unwrap();
}
