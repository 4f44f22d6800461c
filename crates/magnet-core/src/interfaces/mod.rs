// crates/magnet-core/src/interfaces/mod.rs
// ============================================================================
// Module: MAGNET Interfaces
// Description: Trait seams between the core and its external collaborators.
// Purpose: Define the contract surfaces the core runtime is generic over.
// Dependencies: crate::core, crate::dependencies, crate::protocol, crate::state
// ============================================================================

//! ## Overview
//! The core consumes validators, deciders, recompute functions, phase state
//! machines, and escalation responders as opaque collaborators behind these
//! traits. Closures implement the function-shaped seams directly, which keeps
//! tests and simple hosts free of wrapper types. Implementations must be
//! deterministic for replay to hold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ParamPath;
use crate::core::Phase;
use crate::dependencies::invalidation::InvalidationEvent;
use crate::dependencies::invalidation::InvalidationReason;
use crate::protocol::escalation::EscalationRequest;
use crate::protocol::escalation::EscalationResponse;
use crate::protocol::schemas::AgentDecision;
use crate::protocol::schemas::Proposal;
use crate::protocol::schemas::ValidationRequest;
use crate::protocol::schemas::ValidationResult;
use crate::state::store::DesignState;

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Opaque validator pipeline invoked by the cycle executor.
///
/// Rule violations are reported as findings in the result, never as Rust
/// errors; infrastructure failures belong to the host and should surface as
/// error-severity findings so the cycle can escalate.
pub trait DesignValidator {
    /// Validates a proposal against the current tentative state.
    fn validate(&mut self, request: &ValidationRequest) -> ValidationResult;
}

impl<F> DesignValidator for F
where
    F: FnMut(&ValidationRequest) -> ValidationResult,
{
    fn validate(&mut self, request: &ValidationRequest) -> ValidationResult {
        self(request)
    }
}

// ============================================================================
// SECTION: Decision Policy
// ============================================================================

/// Agent-side decision callback consulted after each validation.
///
/// When absent, the cycle executor applies its built-in auto-decision policy.
pub trait DecisionPolicy {
    /// Decides how the cycle proceeds for a validated proposal.
    fn decide(&mut self, proposal: &Proposal, result: &ValidationResult) -> AgentDecision;
}

impl<F> DecisionPolicy for F
where
    F: FnMut(&Proposal, &ValidationResult) -> AgentDecision,
{
    fn decide(&mut self, proposal: &Proposal, result: &ValidationResult) -> AgentDecision {
        self(proposal, result)
    }
}

// ============================================================================
// SECTION: Recompute
// ============================================================================

/// Error returned by a recompute callback for one parameter.
#[derive(Debug, Error)]
#[error("recompute failed: {0}")]
pub struct RecomputeError(pub String);

/// Per-parameter recompute function driven by the cascade executor.
pub trait ParameterRecompute {
    /// Recomputes one stale parameter, writing the result into the state.
    ///
    /// # Errors
    ///
    /// Returns [`RecomputeError`] when the parameter cannot be recomputed;
    /// the cascade executor records the failure and applies its failure
    /// policy.
    fn recompute(
        &mut self,
        path: &ParamPath,
        state: &mut DesignState,
    ) -> Result<(), RecomputeError>;
}

impl<F> ParameterRecompute for F
where
    F: FnMut(&ParamPath, &mut DesignState) -> Result<(), RecomputeError>,
{
    fn recompute(
        &mut self,
        path: &ParamPath,
        state: &mut DesignState,
    ) -> Result<(), RecomputeError> {
        self(path, state)
    }
}

// ============================================================================
// SECTION: Phase States
// ============================================================================

/// Lifecycle status of a design phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Being drafted; edits expected.
    Draft,
    /// Being worked; edits expected.
    InProgress,
    /// Locked against edits.
    Locked,
    /// Formally approved.
    Approved,
    /// Completed and archived.
    Completed,
}

impl PhaseStatus {
    /// Returns true for statuses that should hear about invalidations.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Locked | Self::Approved | Self::Completed)
    }
}

/// Phase state machine notified when settled phases go stale.
pub trait PhaseStates {
    /// Returns the current lifecycle status of a phase.
    fn status(&self, phase: Phase) -> PhaseStatus;

    /// Notifies that an invalidation reached a settled phase.
    fn phase_invalidated(&mut self, phase: Phase, reason: InvalidationReason);
}

// ============================================================================
// SECTION: Invalidation Observer
// ============================================================================

/// Observer invoked for every recorded invalidation event.
pub trait InvalidationObserver {
    /// Receives one aggregated invalidation event.
    fn on_invalidation(&mut self, event: &InvalidationEvent);
}

impl<F> InvalidationObserver for F
where
    F: FnMut(&InvalidationEvent),
{
    fn on_invalidation(&mut self, event: &InvalidationEvent) {
        self(event);
    }
}

// ============================================================================
// SECTION: Escalation Responder
// ============================================================================

/// Callback handling escalation requests routed by level and phase.
pub trait EscalationResponder {
    /// Handles one escalation request, optionally producing a response.
    fn respond(&mut self, request: &EscalationRequest) -> Option<EscalationResponse>;
}

impl<F> EscalationResponder for F
where
    F: FnMut(&EscalationRequest) -> Option<EscalationResponse>,
{
    fn respond(&mut self, request: &EscalationRequest) -> Option<EscalationResponse> {
        self(request)
    }
}
