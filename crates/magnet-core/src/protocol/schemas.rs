// crates/magnet-core/src/protocol/schemas.rs
// ============================================================================
// Module: MAGNET Protocol Schemas
// Description: Message types for agent-validator communication.
// Purpose: Define proposals, validation requests/results, and agent decisions.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The propose-validate-revise protocol exchanges four message families:
//! proposals carrying parameter changes, validation requests, validation
//! results carrying findings, and agent decisions. All types serialize to the
//! canonical JSON forms used by cycle results and escalation context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::AgentId;
use crate::core::DecisionId;
use crate::core::ParamPath;
use crate::core::Phase;
use crate::core::ProposalId;
use crate::core::RequestId;
use crate::core::Timestamp;
use crate::core::ValidatorId;
use crate::core::Value;

// ============================================================================
// SECTION: Status Enums
// ============================================================================

/// Lifecycle status of a proposal through the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Created, not yet applied.
    Pending,
    /// Applied tentatively, awaiting validation.
    Validating,
    /// Approved and committed.
    Approved,
    /// Rejected and rolled back.
    Rejected,
    /// Superseded by a revision.
    Revised,
    /// Escalated to a higher-level handler.
    Escalated,
}

/// Agent decision after seeing a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Commit the proposal.
    Approve,
    /// Roll back and retry with revised changes.
    Revise,
    /// Roll back and hand off to the escalation handler.
    Escalate,
    /// Roll back and reject outright.
    Abort,
}

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Advisory; never blocks approval.
    Warning,
    /// Rule violation; blocks approval.
    Error,
    /// Severe violation; always blocks approval.
    Critical,
}

impl Severity {
    /// Returns true when the severity blocks approval.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

// ============================================================================
// SECTION: Parameter Changes and Proposals
// ============================================================================

/// Single parameter change within a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    /// Dotted parameter path (`hull.beam`).
    pub path: ParamPath,
    /// Prior value, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// Proposed value.
    pub new_value: Value,
    /// Unit tag, free-form.
    pub unit: String,
    /// Why the change is proposed.
    pub reasoning: String,
    /// Agent confidence in [0, 1].
    pub confidence: f64,
    /// Attribution tag for the change origin.
    pub source: String,
}

impl ParameterChange {
    /// Creates a change with empty metadata.
    #[must_use]
    pub fn new(path: ParamPath, old_value: Option<Value>, new_value: Value) -> Self {
        Self {
            path,
            old_value,
            new_value,
            unit: String::new(),
            reasoning: String::new(),
            confidence: 0.8,
            source: String::new(),
        }
    }
}

/// Agent proposal containing an ordered sequence of parameter changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier.
    pub proposal_id: ProposalId,
    /// Authoring agent.
    pub agent_id: AgentId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Phase the proposal targets.
    pub phase: Phase,
    /// 1-based iteration within its cycle.
    pub iteration: u32,
    /// Ordered parameter changes.
    pub changes: Vec<ParameterChange>,
    /// Lifecycle status.
    pub status: ProposalStatus,
    /// Agent reasoning for the proposal.
    pub reasoning: String,
    /// Agent confidence in [0, 1].
    pub confidence: f64,
    /// Parent proposal when this is a revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ProposalId>,
}

impl Proposal {
    /// Creates a pending first-iteration proposal.
    #[must_use]
    pub fn new(
        proposal_id: ProposalId,
        agent_id: AgentId,
        phase: Phase,
        changes: Vec<ParameterChange>,
    ) -> Self {
        Self {
            proposal_id,
            agent_id,
            created_at: Timestamp::Logical(0),
            phase,
            iteration: 1,
            changes,
            status: ProposalStatus::Pending,
            reasoning: String::new(),
            confidence: 0.7,
            parent_id: None,
        }
    }
}

// ============================================================================
// SECTION: Validation Messages
// ============================================================================

/// Single finding from a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    /// Validator that produced the finding.
    pub validator_name: ValidatorId,
    /// Finding severity.
    pub severity: Severity,
    /// Stable rule code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Affected parameter, when parameter-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ParamPath>,
    /// Observed value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
    /// Value the rule expects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    /// Suggested remediation, free-form.
    pub suggestion: String,
}

impl ValidationFinding {
    /// Returns true when the finding carries enough data to synthesize a
    /// revision change: a suggestion, a path, and an expected value.
    #[must_use]
    pub fn drives_revision(&self) -> bool {
        !self.suggestion.is_empty() && self.path.is_some() && self.expected_value.is_some()
    }
}

/// Request to validate a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Request identifier.
    pub request_id: RequestId,
    /// The proposal under validation.
    pub proposal: Proposal,
    /// Validators to run; empty means all applicable.
    pub validators_to_run: Vec<ValidatorId>,
    /// Phase the validation targets.
    pub phase: Phase,
    /// When true, warnings fail validation too.
    pub strict_mode: bool,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Result of validating a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The originating request.
    pub request_id: RequestId,
    /// The validated proposal.
    pub proposal_id: ProposalId,
    /// Overall verdict.
    pub passed: bool,
    /// All findings, in validator order.
    pub findings: Vec<ValidationFinding>,
    /// Count of error and critical findings.
    pub error_count: u32,
    /// Count of warning findings.
    pub warning_count: u32,
    /// Validators that executed.
    pub validators_run: Vec<ValidatorId>,
    /// Wall-clock validation duration in milliseconds.
    pub duration_ms: f64,
}

impl ValidationResult {
    /// Builds a result from findings, computing counts and the verdict.
    ///
    /// The verdict is pass when no blocking finding is present.
    #[must_use]
    pub fn from_findings(
        request_id: RequestId,
        proposal_id: ProposalId,
        findings: Vec<ValidationFinding>,
        validators_run: Vec<ValidatorId>,
        duration_ms: f64,
    ) -> Self {
        let error_count = findings
            .iter()
            .filter(|finding| finding.severity.is_blocking())
            .count();
        let warning_count = findings
            .iter()
            .filter(|finding| finding.severity == Severity::Warning)
            .count();
        Self {
            request_id,
            proposal_id,
            passed: error_count == 0,
            findings,
            error_count: clamp_count(error_count),
            warning_count: clamp_count(warning_count),
            validators_run,
            duration_ms,
        }
    }

    /// Returns true when any blocking finding is present.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Returns true when any warning finding is present.
    #[must_use]
    pub const fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Returns true when any critical finding is present.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.findings.iter().any(|finding| finding.severity == Severity::Critical)
    }
}

/// Saturates a finding count into the wire-format width.
fn clamp_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

// ============================================================================
// SECTION: Agent Decisions
// ============================================================================

/// Agent decision taken after a validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    /// Decision identifier.
    pub decision_id: DecisionId,
    /// The proposal decided on.
    pub proposal_id: ProposalId,
    /// Deciding agent.
    pub agent_id: AgentId,
    /// The decision taken.
    pub decision: DecisionKind,
    /// Why the decision was taken.
    pub reasoning: String,
    /// Agent confidence in [0, 1].
    pub confidence: f64,
    /// Replacement changes, for revisions.
    pub revision_changes: Vec<ParameterChange>,
    /// Escalation reason, for escalations.
    pub escalation_reason: String,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl AgentDecision {
    /// Creates a decision with empty auxiliary fields.
    #[must_use]
    pub fn new(proposal_id: ProposalId, agent_id: AgentId, decision: DecisionKind) -> Self {
        Self {
            decision_id: DecisionId::new(""),
            proposal_id,
            agent_id,
            decision,
            reasoning: String::new(),
            confidence: 0.8,
            revision_changes: Vec::new(),
            escalation_reason: String::new(),
            created_at: Timestamp::Logical(0),
        }
    }
}
