// crates/magnet-core/tests/scenarios.rs
// ============================================================================
// Module: End-to-End Scenario Tests
// Description: Cross-component scenarios over the state and dependency layers.
// Purpose: Validate the cascade pipeline and replay determinism end to end.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Drives realistic flows: a hull dimension change cascading into the
//! displacement chain, cycle detection at build time, and byte-identical
//! trigger logs for identical sessions.

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

use std::sync::Arc;

use magnet_core::DependencyGraph;
use magnet_core::DesignState;
use magnet_core::EdgeType;
use magnet_core::GraphError;
use magnet_core::InvalidateOptions;
use magnet_core::InvalidationEngine;
use magnet_core::ParamPath;
use magnet_core::Timestamp;
use magnet_core::Value;

/// Verifies a hull dimension change cascades into the displacement chain.
#[test]
fn simple_cascade_covers_displacement() {
    let mut graph = DependencyGraph::new();
    for source in ["hull.loa", "hull.beam", "hull.draft", "hull.cb"] {
        graph.add_dependency(
            &ParamPath::new("hull.displacement_m3"),
            &ParamPath::new(source),
            EdgeType::DataFlow,
            1.0,
        );
    }
    graph.build(Timestamp::Logical(0)).unwrap();

    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.loa"), Value::Float(24.0), "seed").unwrap();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "seed").unwrap();
    state.set(&ParamPath::new("hull.draft"), Value::Float(1.4), "seed").unwrap();
    state.set(&ParamPath::new("hull.cb"), Value::Float(0.38), "seed").unwrap();

    let mut engine = InvalidationEngine::new(Arc::new(graph));
    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());

    assert!(engine.is_stale(&ParamPath::new("hull.loa")));
    assert!(engine.is_stale(&ParamPath::new("hull.displacement_m3")));

    let order = engine.recalculation_order().unwrap();
    let loa = order.iter().position(|path| path.as_str() == "hull.loa").unwrap();
    let displacement =
        order.iter().position(|path| path.as_str() == "hull.displacement_m3").unwrap();
    assert!(loa < displacement);
}

/// Verifies the two-node cycle is rejected with both nodes in the path.
#[test]
fn two_node_cycle_is_rejected() {
    let mut graph = DependencyGraph::new();
    graph.add_dependency(&ParamPath::new("a"), &ParamPath::new("b"), EdgeType::DataFlow, 1.0);
    graph.add_dependency(&ParamPath::new("b"), &ParamPath::new("a"), EdgeType::DataFlow, 1.0);

    match graph.build(Timestamp::Logical(0)) {
        Err(GraphError::CyclicDependency { cycle }) => {
            assert!(cycle.contains(&ParamPath::new("a")));
            assert!(cycle.contains(&ParamPath::new("b")));
        }
        other => panic!("expected cycle rejection, got {other:?}"),
    }
}

/// Runs one scripted session and returns its exported trigger log.
fn scripted_session() -> String {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.loa"), Value::Float(24.0), "seed").unwrap();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "seed").unwrap();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.5), "designer").unwrap();
    state
        .set(&ParamPath::new("hull.displacement_m3"), Value::Float(31.046_4), "cascade/recompute")
        .unwrap();
    state.trigger_log().export_string().unwrap()
}

/// Verifies identical sessions export byte-identical trigger logs.
#[test]
fn identical_sessions_replay_byte_identically() {
    assert_eq!(scripted_session(), scripted_session());
}

/// Verifies identical sessions hash identically and diverging ones do not.
#[test]
fn state_hashes_track_semantic_content() {
    let build = |beam: f64| {
        let mut state = DesignState::new();
        state.set(&ParamPath::new("hull.beam"), Value::Float(beam), "seed").unwrap();
        state.canonical_hash().unwrap()
    };

    assert_eq!(build(6.0), build(6.0));
    assert_ne!(build(6.0), build(6.5));
}
