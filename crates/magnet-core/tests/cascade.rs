// crates/magnet-core/tests/cascade.rs
// ============================================================================
// Module: Cascade Executor Tests
// Description: Tests for ordered recomputation over the stale set.
// Purpose: Validate ordering, partial runs, timing, and failure policy.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Ensures cascades walk the stale set in dependency order, mark recomputed
//! parameters valid, honor explicit subsets, and apply the configured
//! failure policy.

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

use std::collections::BTreeSet;
use std::sync::Arc;

use magnet_core::CascadeConfig;
use magnet_core::CascadeExecutor;
use magnet_core::DependencyGraph;
use magnet_core::DesignState;
use magnet_core::EdgeType;
use magnet_core::InvalidateOptions;
use magnet_core::InvalidationEngine;
use magnet_core::ParamPath;
use magnet_core::RecomputeError;
use magnet_core::Timestamp;
use magnet_core::Value;

/// Builds the chain `base -> mid -> top` and an engine with `base` changed.
fn stale_chain() -> (Arc<DependencyGraph>, InvalidationEngine) {
    let mut graph = DependencyGraph::new();
    graph.add_dependency(&ParamPath::new("calc.mid"), &ParamPath::new("calc.base"), EdgeType::DataFlow, 1.0);
    graph.add_dependency(&ParamPath::new("calc.top"), &ParamPath::new("calc.mid"), EdgeType::DataFlow, 1.0);
    graph.build(Timestamp::Logical(0)).unwrap();
    let graph = Arc::new(graph);

    let mut engine = InvalidationEngine::new(Arc::clone(&graph));
    engine.invalidate_parameter(&ParamPath::new("calc.base"), InvalidateOptions::default());
    (graph, engine)
}

/// Verifies execution walks the stale set in dependency order.
#[test]
fn executes_in_dependency_order() {
    let (graph, mut engine) = stale_chain();
    let executor = CascadeExecutor::new(graph, CascadeConfig::default());
    let mut state = DesignState::new();

    let mut visited: Vec<String> = Vec::new();
    let mut recompute = |path: &ParamPath, state: &mut DesignState| {
        visited.push(path.as_str().to_string());
        state.set(path, Value::Int(1), "cascade/recompute").map(|_| ()).map_err(|err| {
            RecomputeError(err.to_string())
        })
    };

    let result = executor.execute(&mut engine, &mut state, &mut recompute, None).unwrap();

    assert_eq!(visited, vec!["calc.base", "calc.mid", "calc.top"]);
    assert_eq!(result.succeeded.len(), 3);
    assert!(result.failed.is_empty());
    assert!(result.skipped.is_empty());
}

/// Verifies successful parameters are marked valid.
#[test]
fn success_marks_valid() {
    let (graph, mut engine) = stale_chain();
    let executor = CascadeExecutor::new(graph, CascadeConfig::default());
    let mut state = DesignState::new();

    let mut recompute =
        |_path: &ParamPath, _state: &mut DesignState| -> Result<(), RecomputeError> { Ok(()) };
    executor.execute(&mut engine, &mut state, &mut recompute, None).unwrap();

    assert!(engine.stale_parameters().is_empty());
}

/// Verifies an explicit subset restricts the run to those stale parameters.
#[test]
fn subset_restricts_run() {
    let (graph, mut engine) = stale_chain();
    let executor = CascadeExecutor::new(graph, CascadeConfig::default());
    let mut state = DesignState::new();

    let subset = BTreeSet::from([ParamPath::new("calc.mid"), ParamPath::new("calc.unknown")]);
    let mut visited: Vec<String> = Vec::new();
    let mut recompute = |path: &ParamPath, _state: &mut DesignState| -> Result<(), RecomputeError> {
        visited.push(path.as_str().to_string());
        Ok(())
    };

    let result =
        executor.execute(&mut engine, &mut state, &mut recompute, Some(&subset)).unwrap();

    assert_eq!(visited, vec!["calc.mid"]);
    assert_eq!(result.succeeded, vec![ParamPath::new("calc.mid")]);
    assert!(engine.is_stale(&ParamPath::new("calc.base")));
    assert!(!engine.is_stale(&ParamPath::new("calc.mid")));
}

/// Verifies the default policy continues past failures.
#[test]
fn continues_past_failure_by_default() {
    let (graph, mut engine) = stale_chain();
    let executor = CascadeExecutor::new(graph, CascadeConfig::default());
    let mut state = DesignState::new();

    let mut recompute = |path: &ParamPath, _state: &mut DesignState| {
        if path.as_str() == "calc.mid" {
            Err(RecomputeError("resistance curve diverged".to_string()))
        } else {
            Ok(())
        }
    };

    let result = executor.execute(&mut engine, &mut state, &mut recompute, None).unwrap();

    assert_eq!(result.succeeded, vec![ParamPath::new("calc.base"), ParamPath::new("calc.top")]);
    assert_eq!(result.failed.len(), 1);
    assert!(result.failed[0].1.contains("resistance curve diverged"));
    assert!(engine.is_stale(&ParamPath::new("calc.mid")));
}

/// Verifies abort_on_failure skips the remainder after a failure.
#[test]
fn abort_on_failure_skips_remainder() {
    let (graph, mut engine) = stale_chain();
    let executor = CascadeExecutor::new(graph, CascadeConfig {
        abort_on_failure: true,
    });
    let mut state = DesignState::new();

    let mut recompute = |path: &ParamPath, _state: &mut DesignState| {
        if path.as_str() == "calc.mid" {
            Err(RecomputeError("bad input".to_string()))
        } else {
            Ok(())
        }
    };

    let result = executor.execute(&mut engine, &mut state, &mut recompute, None).unwrap();

    assert_eq!(result.succeeded, vec![ParamPath::new("calc.base")]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.skipped, vec![ParamPath::new("calc.top")]);
}

/// Verifies per-parameter durations are collected for attempted parameters.
#[test]
fn durations_cover_attempted_parameters() {
    let (graph, mut engine) = stale_chain();
    let executor = CascadeExecutor::new(graph, CascadeConfig::default());
    let mut state = DesignState::new();

    let mut recompute =
        |_path: &ParamPath, _state: &mut DesignState| -> Result<(), RecomputeError> { Ok(()) };
    let result = executor.execute(&mut engine, &mut state, &mut recompute, None).unwrap();

    assert_eq!(result.durations_ms.len(), 3);
    assert!(result.total_duration_ms >= 0.0);
}
