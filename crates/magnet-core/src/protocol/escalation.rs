// crates/magnet-core/src/protocol/escalation.rs
// ============================================================================
// Module: MAGNET Escalation Handler
// Description: Routing of unresolved cycle outcomes by level and phase.
// Purpose: Hand failed cycles to registered responders and track resolution.
// Dependencies: crate::core, crate::interfaces, crate::protocol::schemas, serde
// ============================================================================

//! ## Overview
//! When a cycle exhausts its iterations or a decision escalates, an
//! escalation request is created from the final proposal and validation
//! result. The handler routes requests to responders registered by
//! (level, phase) with wildcard fallbacks, applies the response to the
//! request's status, and keeps a queryable log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::AgentId;
use crate::core::EscalationId;
use crate::core::Phase;
use crate::core::ProposalId;
use crate::core::Timestamp;
use crate::core::Value;
use crate::interfaces::EscalationResponder;
use crate::protocol::schemas::ParameterChange;
use crate::protocol::schemas::Proposal;
use crate::protocol::schemas::ValidationFinding;
use crate::protocol::schemas::ValidationResult;

// ============================================================================
// SECTION: Levels and Statuses
// ============================================================================

/// Escalation severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    /// Informational, no action required.
    Info,
    /// Minor issue, can be deferred.
    Low,
    /// Requires attention within the cycle.
    Medium,
    /// Requires immediate resolution.
    High,
    /// Blocks design progress.
    Critical,
}

/// Lifecycle status of an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// Awaiting a responder.
    Open,
    /// Being worked by a responder.
    InProgress,
    /// Resolved; see the resolution notes.
    Resolved,
    /// Deferred for later.
    Deferred,
    /// Dismissed as not requiring action.
    Dismissed,
}

// ============================================================================
// SECTION: Requests and Responses
// ============================================================================

/// Request for escalation of an unresolved cycle outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRequest {
    /// Escalation identifier.
    pub escalation_id: EscalationId,
    /// The proposal that failed.
    pub proposal_id: ProposalId,
    /// The authoring agent.
    pub agent_id: AgentId,
    /// Phase the proposal targeted.
    pub phase: Phase,
    /// Severity level.
    pub level: EscalationLevel,
    /// Lifecycle status.
    pub status: EscalationStatus,
    /// Rule identifier most responsible, when known.
    pub rule_id: String,
    /// Why the escalation was raised.
    pub reason: String,
    /// Longer description of the failure.
    pub description: String,
    /// Findings from the final validation result.
    pub findings: Vec<ValidationFinding>,
    /// Iterations attempted before escalation.
    pub iterations_attempted: u32,
    /// Structured context for resolution.
    pub context: BTreeMap<String, Value>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Resolution timestamp, when finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Timestamp>,
    /// Resolving handler, when finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// Resolution notes.
    pub resolution_notes: String,
}

impl EscalationRequest {
    /// Marks the escalation resolved.
    pub fn resolve(&mut self, resolved_by: &str, notes: &str, resolved_at: Timestamp) {
        self.status = EscalationStatus::Resolved;
        self.resolved_by = Some(resolved_by.to_string());
        self.resolution_notes = notes.to_string();
        self.resolved_at = Some(resolved_at);
    }

    /// Defers the escalation for later.
    pub fn defer(&mut self, notes: &str) {
        self.status = EscalationStatus::Deferred;
        self.resolution_notes = notes.to_string();
    }

    /// Dismisses the escalation as not requiring action.
    pub fn dismiss(&mut self, notes: &str) {
        self.status = EscalationStatus::Dismissed;
        self.resolution_notes = notes.to_string();
    }
}

/// Action a responder took on an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    /// The issue was resolved.
    Resolved,
    /// The issue was deferred.
    Deferred,
    /// The issue was dismissed.
    Dismissed,
    /// The issue was forwarded to another channel.
    Forwarded,
}

/// Response produced by an escalation responder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationResponse {
    /// The escalation responded to.
    pub escalation_id: EscalationId,
    /// Responder attribution tag.
    pub handler_id: String,
    /// Action taken.
    pub action: EscalationAction,
    /// Resolution text.
    pub resolution: String,
    /// Suggested follow-up changes, when resolved.
    pub suggested_changes: Vec<ParameterChange>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Aggregate counts over the escalation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationSummary {
    /// All logged escalations.
    pub total: usize,
    /// Currently open escalations.
    pub open: usize,
    /// Resolved escalations.
    pub resolved: usize,
    /// Deferred escalations.
    pub deferred: usize,
    /// Dismissed escalations.
    pub dismissed: usize,
    /// Count per severity level.
    pub by_level: BTreeMap<EscalationLevel, usize>,
}

// ============================================================================
// SECTION: Escalation Handler
// ============================================================================

/// Routing key: optional level and phase filters.
type HandlerKey = (Option<EscalationLevel>, Option<Phase>);

/// Registry of escalation responders keyed by level and phase.
pub struct EscalationHandler {
    /// Registered responders; `None` components are wildcards.
    handlers: BTreeMap<HandlerKey, Box<dyn EscalationResponder>>,
    /// Fallback responder when no registration matches.
    default: Option<Box<dyn EscalationResponder>>,
    /// All handled requests, in arrival order.
    log: Vec<EscalationRequest>,
    /// Monotonic counter for resolution timestamps.
    counter: u64,
}

impl Default for EscalationHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EscalationHandler {
    /// Creates an empty handler registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            default: None,
            log: Vec::new(),
            counter: 0,
        }
    }

    /// Registers a responder for a level and/or phase; `None` is a wildcard.
    pub fn register(
        &mut self,
        level: Option<EscalationLevel>,
        phase: Option<Phase>,
        responder: Box<dyn EscalationResponder>,
    ) {
        self.handlers.insert((level, phase), responder);
    }

    /// Sets the fallback responder for unmatched escalations.
    pub fn set_default(&mut self, responder: Box<dyn EscalationResponder>) {
        self.default = Some(responder);
    }

    /// Routes a request to the most specific responder and applies the
    /// response.
    ///
    /// Lookup order: (level, phase), then (level, *), then (*, phase), then
    /// the (*, *) registration, then the default responder. The request is
    /// logged either way; the applied response mutates its status and
    /// resolution notes.
    pub fn handle(&mut self, request: EscalationRequest) -> Option<EscalationResponse> {
        self.counter += 1;
        let stamp = Timestamp::Logical(self.counter);
        let keys: [HandlerKey; 4] = [
            (Some(request.level), Some(request.phase)),
            (Some(request.level), None),
            (None, Some(request.phase)),
            (None, None),
        ];

        self.log.push(request);
        let index = self.log.len() - 1;

        let mut response = None;
        for key in keys {
            if let Some(responder) = self.handlers.get_mut(&key) {
                response = responder.respond(&self.log[index]);
                break;
            }
        }
        if response.is_none() {
            if let Some(fallback) = &mut self.default {
                response = fallback.respond(&self.log[index]);
            }
        }

        if let Some(response) = &response {
            apply_response(&mut self.log[index], response, stamp);
        }
        response
    }

    /// Returns the open escalations, in arrival order.
    #[must_use]
    pub fn open_escalations(&self) -> Vec<&EscalationRequest> {
        self.log
            .iter()
            .filter(|request| request.status == EscalationStatus::Open)
            .collect()
    }

    /// Returns escalations at a level, in arrival order.
    #[must_use]
    pub fn escalations_by_level(&self, level: EscalationLevel) -> Vec<&EscalationRequest> {
        self.log.iter().filter(|request| request.level == level).collect()
    }

    /// Returns escalations for a phase, in arrival order.
    #[must_use]
    pub fn escalations_by_phase(&self, phase: Phase) -> Vec<&EscalationRequest> {
        self.log.iter().filter(|request| request.phase == phase).collect()
    }

    /// Summarizes the escalation log.
    #[must_use]
    pub fn summary(&self) -> EscalationSummary {
        let mut by_level: BTreeMap<EscalationLevel, usize> = BTreeMap::new();
        for request in &self.log {
            *by_level.entry(request.level).or_insert(0) += 1;
        }
        let count = |status: EscalationStatus| {
            self.log.iter().filter(|request| request.status == status).count()
        };
        EscalationSummary {
            total: self.log.len(),
            open: count(EscalationStatus::Open),
            resolved: count(EscalationStatus::Resolved),
            deferred: count(EscalationStatus::Deferred),
            dismissed: count(EscalationStatus::Dismissed),
            by_level,
        }
    }
}

/// Applies a responder's action to the logged request.
fn apply_response(
    request: &mut EscalationRequest,
    response: &EscalationResponse,
    stamp: Timestamp,
) {
    match response.action {
        EscalationAction::Resolved => {
            request.resolve(&response.handler_id, &response.resolution, stamp);
        }
        EscalationAction::Deferred => request.defer(&response.resolution),
        EscalationAction::Dismissed => request.dismiss(&response.resolution),
        EscalationAction::Forwarded => {
            request.status = EscalationStatus::InProgress;
            request.resolution_notes = response.resolution.clone();
        }
    }
}

// ============================================================================
// SECTION: Cycle Integration
// ============================================================================

/// Builds an escalation request from a failed cycle.
///
/// The level derives from the final error count: five or more errors is
/// high, two or more is medium, anything else is low. The final proposal and
/// validation result are embedded as structured context.
#[must_use]
pub fn escalation_from_cycle(
    proposal: &Proposal,
    result: &ValidationResult,
    reason: &str,
    iterations: u32,
) -> EscalationRequest {
    let level = if result.error_count >= 5 {
        EscalationLevel::High
    } else if result.error_count >= 2 {
        EscalationLevel::Medium
    } else {
        EscalationLevel::Low
    };

    let rule_id = result
        .findings
        .iter()
        .find(|finding| finding.severity.is_blocking())
        .map_or_else(String::new, |finding| finding.code.clone());

    let mut context = BTreeMap::new();
    context.insert("proposal".to_string(), to_context_value(proposal));
    context.insert("validation_result".to_string(), to_context_value(result));

    EscalationRequest {
        escalation_id: EscalationId::new(format!("esc-{}", proposal.proposal_id)),
        proposal_id: proposal.proposal_id.clone(),
        agent_id: proposal.agent_id.clone(),
        phase: proposal.phase,
        level,
        status: EscalationStatus::Open,
        rule_id,
        reason: reason.to_string(),
        description: format!(
            "Proposal {} failed after {} iterations",
            proposal.proposal_id, iterations
        ),
        findings: result.findings.clone(),
        iterations_attempted: iterations,
        context,
        created_at: proposal.created_at,
        resolved_at: None,
        resolved_by: None,
        resolution_notes: String::new(),
    }
}

/// Serializes a record into the context value tree.
fn to_context_value<T: Serialize>(record: &T) -> Value {
    serde_json::to_value(record).map_or(Value::Null, Value::from)
}
