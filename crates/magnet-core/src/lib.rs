// crates/magnet-core/src/lib.rs
// ============================================================================
// Module: MAGNET Core Library
// Description: Public API surface for the MAGNET design core.
// Purpose: Expose core types, interfaces, state, dependencies, and protocol.
// Dependencies: crate::{core, dependencies, interfaces, protocol, state}
// ============================================================================

//! ## Overview
//! MAGNET core provides the machinery of the parametric design environment:
//! the audited transactional state store, the typed dependency graph with
//! cascade invalidation and ordered recomputation, and the bounded
//! propose-validate-revise protocol with escalation. Domain validators stay
//! external and integrate through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod dependencies;
pub mod interfaces;
pub mod protocol;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use dependencies::CascadeConfig;
pub use dependencies::CascadeExecutor;
pub use dependencies::CascadeResult;
pub use dependencies::DependencyGraph;
pub use dependencies::EdgeType;
pub use dependencies::GraphError;
pub use dependencies::InvalidateOptions;
pub use dependencies::InvalidationEngine;
pub use dependencies::InvalidationEvent;
pub use dependencies::InvalidationReason;
pub use dependencies::InvalidationScope;
pub use dependencies::RecalculationOrder;
pub use dependencies::RevalidationScheduler;
pub use dependencies::RevalidationTask;
pub use dependencies::standard_graph;
pub use interfaces::DecisionPolicy;
pub use interfaces::DesignValidator;
pub use interfaces::EscalationResponder;
pub use interfaces::InvalidationObserver;
pub use interfaces::ParameterRecompute;
pub use interfaces::PhaseStates;
pub use interfaces::PhaseStatus;
pub use interfaces::RecomputeError;
pub use protocol::AgentDecision;
pub use protocol::AutoDecision;
pub use protocol::CycleConfig;
pub use protocol::CycleError;
pub use protocol::CycleExecutor;
pub use protocol::CycleResult;
pub use protocol::DecisionKind;
pub use protocol::EscalationHandler;
pub use protocol::EscalationLevel;
pub use protocol::EscalationRequest;
pub use protocol::EscalationResponse;
pub use protocol::EscalationStatus;
pub use protocol::ParameterChange;
pub use protocol::Proposal;
pub use protocol::ProposalStatus;
pub use protocol::Severity;
pub use protocol::ValidationFinding;
pub use protocol::ValidationRequest;
pub use protocol::ValidationResult;
pub use protocol::escalation_from_cycle;
pub use state::DesignState;
pub use state::IsolationLevel;
pub use state::StateError;
pub use state::TransactionGuard;
pub use state::TransactionManager;
pub use state::TriggerEntry;
pub use state::TriggerLog;
pub use state::TriggerQuery;
pub use state::TriggerType;
