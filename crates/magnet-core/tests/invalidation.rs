// crates/magnet-core/tests/invalidation.rs
// ============================================================================
// Module: Invalidation Engine Tests
// Description: Tests for cascade staleness marking and event history.
// Purpose: Validate stale sets, event aggregation, and listener wiring.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Ensures cascades cover the downstream closure, events aggregate one call
//! into one record, the ring buffer bounds history, and settled phases hear
//! about invalidations.

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
use std::sync::Arc;

use magnet_core::DependencyGraph;
use magnet_core::EdgeType;
use magnet_core::InvalidateOptions;
use magnet_core::InvalidationEngine;
use magnet_core::InvalidationReason;
use magnet_core::InvalidationScope;
use magnet_core::ParamPath;
use magnet_core::Phase;
use magnet_core::PhaseStates;
use magnet_core::PhaseStatus;
use magnet_core::Timestamp;
use magnet_core::Value;

/// Builds the hull displacement chain used across these tests.
fn hull_graph() -> Arc<DependencyGraph> {
    let mut graph = DependencyGraph::new();
    for source in ["hull.loa", "hull.beam", "hull.draft", "hull.cb"] {
        graph.add_dependency(
            &ParamPath::new("hull.displacement_m3"),
            &ParamPath::new(source),
            EdgeType::DataFlow,
            1.0,
        );
    }
    graph.add_dependency(
        &ParamPath::new("resistance.total_resistance_kn"),
        &ParamPath::new("hull.displacement_m3"),
        EdgeType::DataFlow,
        1.0,
    );
    graph.build(Timestamp::Logical(0)).unwrap();
    Arc::new(graph)
}

/// Verifies a non-cascading invalidation marks only the parameter.
#[test]
fn invalidate_single_parameter() {
    let mut engine = InvalidationEngine::new(hull_graph());
    let event = engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions {
        cascade: false,
        ..InvalidateOptions::default()
    });

    assert_eq!(event.scope, InvalidationScope::Parameter);
    assert!(engine.is_stale(&ParamPath::new("hull.loa")));
    assert!(!engine.is_stale(&ParamPath::new("hull.displacement_m3")));
}

/// Verifies a cascading invalidation covers the downstream closure.
#[test]
fn invalidate_cascades_downstream() {
    let mut engine = InvalidationEngine::new(hull_graph());
    let event =
        engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());

    assert_eq!(event.scope, InvalidationScope::Downstream);
    assert!(event.invalidated_parameters.contains(&ParamPath::new("hull.loa")));
    assert!(event.invalidated_parameters.contains(&ParamPath::new("hull.displacement_m3")));
    assert!(
        event
            .invalidated_parameters
            .contains(&ParamPath::new("resistance.total_resistance_kn"))
    );
    assert!(engine.is_stale(&ParamPath::new("resistance.total_resistance_kn")));
    assert!(event.invalidated_phases.contains(&Phase::HullForm));
    assert!(event.invalidated_phases.contains(&Phase::Propulsion));
}

/// Verifies a cascade records one aggregated event, not one per parameter.
#[test]
fn cascade_records_single_event() {
    let mut engine = InvalidationEngine::new(hull_graph());
    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());
    assert_eq!(engine.events().count(), 1);
}

/// Verifies old and new values ride on the event.
#[test]
fn event_carries_values_and_attribution() {
    let mut engine = InvalidationEngine::new(hull_graph());
    let event = engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions {
        old_value: Some(Value::Float(24.0)),
        new_value: Some(Value::Float(26.0)),
        triggered_by: Some("designer".to_string()),
        ..InvalidateOptions::default()
    });

    assert_eq!(event.old_value, Some(Value::Float(24.0)));
    assert_eq!(event.new_value, Some(Value::Float(26.0)));
    assert_eq!(event.triggered_by.as_deref(), Some("designer"));
    assert_eq!(event.reason, InvalidationReason::ParameterChanged);
}

/// Verifies phase invalidation marks the phase and its parameters.
#[test]
fn invalidate_phase_marks_members() {
    let mut engine = InvalidationEngine::new(hull_graph());
    let event = engine.invalidate_phase(Phase::HullForm, InvalidationReason::PhaseUnlocked);

    assert_eq!(event.scope, InvalidationScope::Phase);
    assert!(engine.is_phase_stale(Phase::HullForm));
    assert!(engine.is_stale(&ParamPath::new("hull.loa")));
}

/// Verifies invalidate_all marks everything with one ALL-scoped event.
#[test]
fn invalidate_all_marks_everything() {
    let mut engine = InvalidationEngine::new(hull_graph());
    let event = engine.invalidate_all(InvalidationReason::SchemaMigration);

    assert_eq!(event.scope, InvalidationScope::All);
    assert_eq!(event.reason, InvalidationReason::SchemaMigration);
    assert_eq!(engine.events().count(), 1);
    for path in engine.graph().all_parameters() {
        assert!(engine.is_stale(&path), "{path} should be stale");
    }
}

/// Verifies mark_valid clears one parameter and leaves downstream staleness.
#[test]
fn mark_valid_is_local() {
    let mut engine = InvalidationEngine::new(hull_graph());
    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());

    engine.mark_valid(&ParamPath::new("hull.loa"));
    assert!(!engine.is_stale(&ParamPath::new("hull.loa")));
    assert!(engine.is_stale(&ParamPath::new("hull.displacement_m3")));
}

/// Verifies stale parameters filter by owning phase.
#[test]
fn stale_parameters_filter_by_phase() {
    let mut engine = InvalidationEngine::new(hull_graph());
    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());

    let hull = engine.stale_parameters_for_phase(Phase::HullForm);
    assert!(hull.contains(&ParamPath::new("hull.loa")));
    assert!(hull.contains(&ParamPath::new("hull.displacement_m3")));
    assert!(!hull.contains(&ParamPath::new("resistance.total_resistance_kn")));
}

/// Verifies the recalculation order lists sources before derivations.
#[test]
fn recalculation_order_is_topological() {
    let mut engine = InvalidationEngine::new(hull_graph());
    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());

    let order = engine.recalculation_order().unwrap();
    let position = |name: &str| order.iter().position(|path| path.as_str() == name).unwrap();
    assert!(position("hull.loa") < position("hull.displacement_m3"));
    assert!(position("hull.displacement_m3") < position("resistance.total_resistance_kn"));
}

/// Verifies the ring buffer drops the oldest events.
#[test]
fn event_buffer_is_bounded() {
    let mut engine = InvalidationEngine::with_capacity(hull_graph(), 3);
    for _ in 0..5 {
        engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());
    }
    assert_eq!(engine.events().count(), 3);
    assert_eq!(engine.recent_events(2).len(), 2);
}

/// Verifies registered observers see every event.
#[test]
fn observers_receive_events() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let mut engine = InvalidationEngine::new(hull_graph());
    engine.register_observer(Box::new(move |event: &magnet_core::InvalidationEvent| {
        sink.borrow_mut().push(event.event_id.as_str().to_string());
    }));

    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());
    engine.invalidate_phase(Phase::HullForm, InvalidationReason::Manual);

    assert_eq!(seen.borrow().len(), 2);
}

/// Phase listener recording notifications for settled phases.
struct SettledRecorder {
    /// Phases reported as settled.
    settled: Vec<Phase>,
    /// Notifications received.
    notified: Rc<RefCell<Vec<Phase>>>,
}

impl PhaseStates for SettledRecorder {
    fn status(&self, phase: Phase) -> PhaseStatus {
        if self.settled.contains(&phase) {
            PhaseStatus::Locked
        } else {
            PhaseStatus::InProgress
        }
    }

    fn phase_invalidated(&mut self, phase: Phase, _reason: InvalidationReason) {
        self.notified.borrow_mut().push(phase);
    }
}

/// Verifies only settled downstream phases are notified.
#[test]
fn settled_phases_are_notified() {
    let notified: Rc<RefCell<Vec<Phase>>> = Rc::new(RefCell::new(Vec::new()));
    let mut engine = InvalidationEngine::new(hull_graph());
    engine.set_phase_states(Box::new(SettledRecorder {
        settled: vec![Phase::Propulsion],
        notified: Rc::clone(&notified),
    }));

    engine.invalidate_parameter(&ParamPath::new("hull.loa"), InvalidateOptions::default());

    assert_eq!(notified.borrow().as_slice(), &[Phase::Propulsion]);
}
