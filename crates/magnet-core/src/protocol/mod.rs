// crates/magnet-core/src/protocol/mod.rs
// ============================================================================
// Module: MAGNET Agent-Validator Protocol
// Description: Propose-validate-revise schemas, executor, and escalation.
// Purpose: Drive agent proposals through the validator pipeline safely.
// Dependencies: crate::core, crate::interfaces, crate::state
// ============================================================================

//! ## Overview
//! The protocol layer is the control plane of the design loop: proposals are
//! applied tentatively, validated, and decided on; unresolved outcomes are
//! escalated with full context.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod escalation;
pub mod executor;
pub mod schemas;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use escalation::EscalationAction;
pub use escalation::EscalationHandler;
pub use escalation::EscalationLevel;
pub use escalation::EscalationRequest;
pub use escalation::EscalationResponse;
pub use escalation::EscalationStatus;
pub use escalation::EscalationSummary;
pub use escalation::escalation_from_cycle;
pub use executor::AutoDecision;
pub use executor::CycleConfig;
pub use executor::CycleError;
pub use executor::CycleExecutor;
pub use executor::CycleResult;
pub use executor::IterationRecord;
pub use executor::auto_decision;
pub use schemas::AgentDecision;
pub use schemas::DecisionKind;
pub use schemas::ParameterChange;
pub use schemas::Proposal;
pub use schemas::ProposalStatus;
pub use schemas::Severity;
pub use schemas::ValidationFinding;
pub use schemas::ValidationRequest;
pub use schemas::ValidationResult;
