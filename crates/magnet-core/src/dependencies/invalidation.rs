// crates/magnet-core/src/dependencies/invalidation.rs
// ============================================================================
// Module: MAGNET Invalidation Engine
// Description: Cascade staleness marking with a bounded event history.
// Purpose: Track stale parameters and phases when upstream values change.
// Dependencies: crate::core, crate::dependencies::graph, crate::interfaces, serde
// ============================================================================

//! ## Overview
//! The invalidation engine owns the mutable stale sets. A parameter change
//! cascades along the dependency graph's downstream closure; the whole
//! cascade is recorded as one aggregated event in a bounded ring buffer.
//! Registered observers see every event; an optional phase-state listener is
//! notified for downstream phases that were already settled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::EventId;
use crate::core::ParamPath;
use crate::core::Phase;
use crate::core::Timestamp;
use crate::core::Value;
use crate::core::phase_for_parameter;
use crate::dependencies::graph::DependencyGraph;
use crate::dependencies::graph::GraphError;
use crate::interfaces::InvalidationObserver;
use crate::interfaces::PhaseStates;

// ============================================================================
// SECTION: Event Model
// ============================================================================

/// Why an invalidation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// A parameter value changed.
    ParameterChanged,
    /// An explicit manual invalidation.
    Manual,
    /// A settled phase was unlocked for edits.
    PhaseUnlocked,
    /// An upstream dependency was invalidated.
    DependencyInvalidated,
    /// The state schema migrated.
    SchemaMigration,
    /// A cached derivation expired.
    CacheExpired,
    /// A validation run failed.
    ValidationFailed,
}

/// How far an invalidation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationScope {
    /// A single parameter.
    Parameter,
    /// A whole phase.
    Phase,
    /// A parameter plus its transitive downstream closure.
    Downstream,
    /// Every known parameter.
    All,
}

/// Aggregated record of one invalidation call.
///
/// A cascading call produces exactly one event carrying the whole
/// invalidated set, not one event per downstream parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Event identifier, counter-derived (`event-N`).
    pub event_id: EventId,
    /// Event timestamp (engine-local logical tick).
    pub timestamp: Timestamp,
    /// Triggering parameter, for parameter-scoped events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_parameter: Option<ParamPath>,
    /// Triggering phase, for phase-scoped events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_phase: Option<Phase>,
    /// Why the invalidation happened.
    pub reason: InvalidationReason,
    /// How far the invalidation reached.
    pub scope: InvalidationScope,
    /// Every parameter marked stale by this event, ascending.
    pub invalidated_parameters: BTreeSet<ParamPath>,
    /// Every phase marked stale by this event, ascending.
    pub invalidated_phases: BTreeSet<Phase>,
    /// Prior value of the trigger parameter, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// New value of the trigger parameter, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// Caller attribution tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    /// Free-form structured metadata.
    pub metadata: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Options for [`InvalidationEngine::invalidate_parameter`].
#[derive(Debug, Clone)]
pub struct InvalidateOptions {
    /// Cascade to the downstream closure (default true).
    pub cascade: bool,
    /// Reason recorded on the event.
    pub reason: InvalidationReason,
    /// Prior value of the trigger parameter.
    pub old_value: Option<Value>,
    /// New value of the trigger parameter.
    pub new_value: Option<Value>,
    /// Caller attribution tag.
    pub triggered_by: Option<String>,
    /// Free-form structured metadata.
    pub metadata: BTreeMap<String, Value>,
}

impl Default for InvalidateOptions {
    fn default() -> Self {
        Self {
            cascade: true,
            reason: InvalidationReason::ParameterChanged,
            old_value: None,
            new_value: None,
            triggered_by: None,
            metadata: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Invalidation Engine
// ============================================================================

/// Default event ring-buffer capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Engine tracking stale parameters and phases against a built graph.
pub struct InvalidationEngine {
    /// The immutable dependency graph consulted for cascades.
    graph: Arc<DependencyGraph>,
    /// Parameters currently stale.
    stale_parameters: BTreeSet<ParamPath>,
    /// Phases currently stale.
    stale_phases: BTreeSet<Phase>,
    /// Bounded event history, oldest first.
    events: VecDeque<InvalidationEvent>,
    /// Maximum retained events.
    capacity: usize,
    /// Monotonic counter for event identifiers and timestamps.
    counter: u64,
    /// Observers invoked per event.
    observers: Vec<Box<dyn InvalidationObserver>>,
    /// Optional phase lifecycle listener.
    phase_states: Option<Box<dyn PhaseStates>>,
}

impl InvalidationEngine {
    /// Creates an engine over a built graph with the default event capacity.
    #[must_use]
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self::with_capacity(graph, DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an engine with an explicit event capacity.
    #[must_use]
    pub fn with_capacity(graph: Arc<DependencyGraph>, capacity: usize) -> Self {
        Self {
            graph,
            stale_parameters: BTreeSet::new(),
            stale_phases: BTreeSet::new(),
            events: VecDeque::new(),
            capacity: capacity.max(1),
            counter: 0,
            observers: Vec::new(),
            phase_states: None,
        }
    }

    /// Returns the graph this engine consults.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Registers an observer invoked for every recorded event.
    pub fn register_observer(&mut self, observer: Box<dyn InvalidationObserver>) {
        self.observers.push(observer);
    }

    /// Attaches the phase lifecycle listener.
    pub fn set_phase_states(&mut self, listener: Box<dyn PhaseStates>) {
        self.phase_states = Some(listener);
    }

    /// Marks a parameter stale, optionally cascading downstream.
    ///
    /// Returns the aggregated event; the same event is retained in the ring
    /// buffer and delivered to observers.
    pub fn invalidate_parameter(
        &mut self,
        path: &ParamPath,
        options: InvalidateOptions,
    ) -> InvalidationEvent {
        let mut invalidated: BTreeSet<ParamPath> = BTreeSet::new();
        invalidated.insert(path.clone());
        let mut phases: BTreeSet<Phase> = BTreeSet::new();
        if let Some(own) = self.graph.node(path).and_then(|node| node.phase).or_else(|| phase_for_parameter(path)) {
            phases.insert(own);
        }

        let scope = if options.cascade {
            invalidated.extend(self.graph.all_downstream(path));
            phases.extend(self.graph.downstream_phases(path));
            InvalidationScope::Downstream
        } else {
            InvalidationScope::Parameter
        };

        self.stale_parameters.extend(invalidated.iter().cloned());
        self.stale_phases.extend(phases.iter().copied());

        self.record(InvalidationEvent {
            event_id: EventId::new(""),
            timestamp: Timestamp::Logical(0),
            trigger_parameter: Some(path.clone()),
            trigger_phase: None,
            reason: options.reason,
            scope,
            invalidated_parameters: invalidated,
            invalidated_phases: phases,
            old_value: options.old_value,
            new_value: options.new_value,
            triggered_by: options.triggered_by,
            metadata: options.metadata,
        })
    }

    /// Marks a whole phase and all of its known parameters stale.
    pub fn invalidate_phase(
        &mut self,
        phase: Phase,
        reason: InvalidationReason,
    ) -> InvalidationEvent {
        let parameters: BTreeSet<ParamPath> =
            self.graph.parameters_for_phase(phase).into_iter().collect();
        self.stale_phases.insert(phase);
        self.stale_parameters.extend(parameters.iter().cloned());

        let mut phases = BTreeSet::new();
        phases.insert(phase);

        self.record(InvalidationEvent {
            event_id: EventId::new(""),
            timestamp: Timestamp::Logical(0),
            trigger_parameter: None,
            trigger_phase: Some(phase),
            reason,
            scope: InvalidationScope::Phase,
            invalidated_parameters: parameters,
            invalidated_phases: phases,
            old_value: None,
            new_value: None,
            triggered_by: None,
            metadata: BTreeMap::new(),
        })
    }

    /// Marks every known parameter and phase stale.
    pub fn invalidate_all(&mut self, reason: InvalidationReason) -> InvalidationEvent {
        let parameters: BTreeSet<ParamPath> = self.graph.all_parameters().into_iter().collect();
        let phases: BTreeSet<Phase> = parameters
            .iter()
            .filter_map(|path| self.graph.node(path).and_then(|node| node.phase))
            .collect();

        self.stale_parameters.extend(parameters.iter().cloned());
        self.stale_phases.extend(phases.iter().copied());

        self.record(InvalidationEvent {
            event_id: EventId::new(""),
            timestamp: Timestamp::Logical(0),
            trigger_parameter: None,
            trigger_phase: None,
            reason,
            scope: InvalidationScope::All,
            invalidated_parameters: parameters,
            invalidated_phases: phases,
            old_value: None,
            new_value: None,
            triggered_by: None,
            metadata: BTreeMap::new(),
        })
    }

    /// Clears staleness for one parameter; downstream staleness is untouched.
    pub fn mark_valid(&mut self, path: &ParamPath) {
        self.stale_parameters.remove(path);
    }

    /// Clears staleness for a phase.
    pub fn mark_phase_valid(&mut self, phase: Phase) {
        self.stale_phases.remove(&phase);
    }

    /// Returns true when the parameter is stale.
    #[must_use]
    pub fn is_stale(&self, path: &ParamPath) -> bool {
        self.stale_parameters.contains(path)
    }

    /// Returns true when the phase is stale.
    #[must_use]
    pub fn is_phase_stale(&self, phase: Phase) -> bool {
        self.stale_phases.contains(&phase)
    }

    /// Returns the stale parameters, ascending.
    #[must_use]
    pub const fn stale_parameters(&self) -> &BTreeSet<ParamPath> {
        &self.stale_parameters
    }

    /// Returns the stale phases, ascending.
    #[must_use]
    pub const fn stale_phases(&self) -> &BTreeSet<Phase> {
        &self.stale_phases
    }

    /// Returns the stale parameters owned by a phase.
    #[must_use]
    pub fn stale_parameters_for_phase(&self, phase: Phase) -> BTreeSet<ParamPath> {
        self.stale_parameters
            .iter()
            .filter(|path| {
                self.graph
                    .node(path)
                    .and_then(|node| node.phase)
                    .or_else(|| phase_for_parameter(path))
                    == Some(phase)
            })
            .cloned()
            .collect()
    }

    /// Orders the current stale set for recomputation.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotBuilt`] when the graph has not been built.
    pub fn recalculation_order(&self) -> Result<Vec<ParamPath>, GraphError> {
        self.graph.recalculation_order(&self.stale_parameters)
    }

    /// Returns retained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &InvalidationEvent> {
        self.events.iter()
    }

    /// Returns the most recent `count` events, oldest first.
    #[must_use]
    pub fn recent_events(&self, count: usize) -> Vec<&InvalidationEvent> {
        let skip = self.events.len().saturating_sub(count);
        self.events.iter().skip(skip).collect()
    }

    /// Returns events whose invalidated set contains the parameter.
    #[must_use]
    pub fn events_for_parameter(&self, path: &ParamPath) -> Vec<&InvalidationEvent> {
        self.events
            .iter()
            .filter(|event| event.invalidated_parameters.contains(path))
            .collect()
    }

    /// Stamps, retains, and publishes an event.
    fn record(&mut self, mut event: InvalidationEvent) -> InvalidationEvent {
        self.counter += 1;
        event.event_id = EventId::new(format!("event-{}", self.counter));
        event.timestamp = Timestamp::Logical(self.counter);

        self.events.push_back(event.clone());
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }

        for observer in &mut self.observers {
            observer.on_invalidation(&event);
        }
        if let Some(listener) = &mut self.phase_states {
            for phase in &event.invalidated_phases {
                if listener.status(*phase).is_settled() {
                    listener.phase_invalidated(*phase, event.reason);
                }
            }
        }
        event
    }
}
