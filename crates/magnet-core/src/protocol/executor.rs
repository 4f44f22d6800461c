// crates/magnet-core/src/protocol/executor.rs
// ============================================================================
// Module: MAGNET Cycle Executor
// Description: The propose-validate-revise control loop.
// Purpose: Drive proposals through tentative state, validation, and decision.
// Dependencies: crate::core, crate::interfaces, crate::protocol, crate::state
// ============================================================================

//! ## Overview
//! The cycle executor applies a proposal's changes tentatively inside a
//! transaction, runs the injected validator, and processes the agent decision:
//! approve commits, revise rolls back and retries with synthesized changes,
//! escalate and abort roll back and stop. The loop is iterative, bounded by
//! `max_iterations` and a wall-clock deadline, and rolls back on every
//! non-approve exit including error propagation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::CycleId;
use crate::core::ErrorEnvelope;
use crate::core::ProposalId;
use crate::core::RequestId;
use crate::core::Timestamp;
use crate::core::ToEnvelope;
use crate::core::Value;
use crate::interfaces::DecisionPolicy;
use crate::interfaces::DesignValidator;
use crate::protocol::schemas::AgentDecision;
use crate::protocol::schemas::DecisionKind;
use crate::protocol::schemas::ParameterChange;
use crate::protocol::schemas::Proposal;
use crate::protocol::schemas::ProposalStatus;
use crate::protocol::schemas::ValidationRequest;
use crate::protocol::schemas::ValidationResult;
use crate::state::store::DesignState;
use crate::state::store::StateError;
use crate::state::transactions::IsolationLevel;
use crate::state::transactions::TransactionError;
use crate::state::transactions::TransactionManager;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the propose-validate-revise cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Maximum revision iterations before escalation.
    pub max_iterations: u32,
    /// Wall-clock deadline for a single cycle, seconds.
    pub timeout_seconds: f64,
    /// When true, warnings fail validation too.
    pub strict_mode: bool,
    /// When true, approved proposals report as committed.
    pub auto_commit: bool,
    /// When true, each iteration runs inside a transaction.
    pub use_transactions: bool,
    /// When true, non-approve exits restore the pre-cycle state.
    pub rollback_on_failure: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            timeout_seconds: 30.0,
            strict_mode: false,
            auto_commit: true,
            use_transactions: true,
            rollback_on_failure: true,
        }
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// One iteration's footprint in the cycle history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration index.
    pub iteration: u32,
    /// Proposal validated in this iteration.
    pub proposal_id: ProposalId,
    /// Validation verdict.
    pub validation_passed: bool,
    /// Blocking finding count.
    pub error_count: u32,
    /// Warning finding count.
    pub warning_count: u32,
    /// Decision taken after validation.
    pub decision: DecisionKind,
}

/// Result of a complete propose-validate-revise cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    /// Cycle identifier (`cycle-N`).
    pub cycle_id: CycleId,
    /// The proposal as it stood when the cycle ended.
    pub final_proposal: Proposal,
    /// The last validation result, when any iteration ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<ValidationResult>,
    /// Iterations executed.
    pub iterations: u32,
    /// Total wall-clock duration, milliseconds.
    pub total_duration_ms: f64,
    /// True when the cycle ended in approval.
    pub success: bool,
    /// True when the approved changes were committed.
    pub committed: bool,
    /// True when the cycle handed off to escalation.
    pub escalated: bool,
    /// Escalation reason, when escalated.
    pub escalation_reason: String,
    /// Per-iteration history.
    pub history: Vec<IterationRecord>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal cycle failures; the tentative state is rolled back before these
/// propagate.
#[derive(Debug, Error)]
pub enum CycleError {
    /// A state write failed while applying proposal changes.
    #[error("cycle {cycle_id} state error: {source}")]
    State {
        /// The failing cycle.
        cycle_id: CycleId,
        /// Underlying state error.
        source: StateError,
    },
    /// A transaction operation failed.
    #[error("cycle {cycle_id} transaction error: {source}")]
    Transaction {
        /// The failing cycle.
        cycle_id: CycleId,
        /// Underlying transaction error.
        source: TransactionError,
    },
}

impl ToEnvelope for CycleError {
    fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            Self::State { source, .. } => source.to_envelope(),
            Self::Transaction { source, .. } => source.to_envelope(),
        }
    }
}

// ============================================================================
// SECTION: Auto Decision
// ============================================================================

/// Built-in decision policy applied when no decider is injected.
///
/// Approve on pass, revise when blocking findings carry usable suggestions,
/// escalate when they do not, approve when only warnings remain.
#[must_use]
pub fn auto_decision(proposal: &Proposal, result: &ValidationResult) -> AgentDecision {
    if result.passed && !result.has_critical() {
        let mut decision = AgentDecision::new(
            proposal.proposal_id.clone(),
            proposal.agent_id.clone(),
            DecisionKind::Approve,
        );
        decision.reasoning = "Validation passed".to_string();
        decision.confidence = 0.9;
        return decision;
    }

    if result.has_errors() || result.has_critical() {
        let usable: Vec<&crate::protocol::schemas::ValidationFinding> =
            result.findings.iter().filter(|finding| finding.drives_revision()).collect();
        if usable.is_empty() {
            let mut decision = AgentDecision::new(
                proposal.proposal_id.clone(),
                proposal.agent_id.clone(),
                DecisionKind::Escalate,
            );
            decision.escalation_reason = format!(
                "Validation failed with {} errors, no revision suggestions",
                result.error_count
            );
            decision.confidence = 0.7;
            return decision;
        }

        let changes = usable
            .iter()
            .filter_map(|finding| {
                let path = finding.path.clone()?;
                let expected = finding.expected_value.clone()?;
                Some(ParameterChange {
                    path,
                    old_value: finding.actual_value.clone(),
                    new_value: expected,
                    unit: String::new(),
                    reasoning: format!(
                        "Suggested by {}: {}",
                        finding.validator_name, finding.suggestion
                    ),
                    confidence: 0.6,
                    source: format!("validator:{}", finding.validator_name),
                })
            })
            .collect::<Vec<_>>();

        let mut decision = AgentDecision::new(
            proposal.proposal_id.clone(),
            proposal.agent_id.clone(),
            DecisionKind::Revise,
        );
        decision.reasoning =
            format!("Attempting revision based on {} suggestions", changes.len());
        decision.revision_changes = changes;
        decision.confidence = 0.6;
        return decision;
    }

    let mut decision = AgentDecision::new(
        proposal.proposal_id.clone(),
        proposal.agent_id.clone(),
        DecisionKind::Approve,
    );
    decision.reasoning =
        format!("Validation passed with {} warnings", result.warning_count);
    decision.confidence = 0.8;
    decision
}

/// Unit decision policy delegating to [`auto_decision`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDecision;

impl DecisionPolicy for AutoDecision {
    fn decide(&mut self, proposal: &Proposal, result: &ValidationResult) -> AgentDecision {
        auto_decision(proposal, result)
    }
}

// ============================================================================
// SECTION: Cycle Executor
// ============================================================================

/// Source tag stamped on writes issued by the executor.
const EXECUTOR_SOURCE: &str = "protocol/cycle_executor";

/// Executor driving proposals through the propose-validate-revise loop.
pub struct CycleExecutor<V, D = AutoDecision> {
    /// Injected validator pipeline.
    validator: V,
    /// Injected decision policy; `None` selects [`auto_decision`].
    decider: Option<D>,
    /// Cycle configuration.
    config: CycleConfig,
    /// Monotonic counter for cycle identifiers.
    counter: u64,
}

impl<V> CycleExecutor<V, AutoDecision>
where
    V: DesignValidator,
{
    /// Creates an executor using the built-in auto-decision policy.
    #[must_use]
    pub const fn new(validator: V, config: CycleConfig) -> Self {
        Self {
            validator,
            decider: None,
            config,
            counter: 0,
        }
    }
}

impl<V, D> CycleExecutor<V, D>
where
    V: DesignValidator,
    D: DecisionPolicy,
{
    /// Creates an executor with an injected decision policy.
    #[must_use]
    pub const fn with_decider(validator: V, decider: D, config: CycleConfig) -> Self {
        Self {
            validator,
            decider: Some(decider),
            config,
            counter: 0,
        }
    }

    /// Executes one complete propose-validate-revise cycle.
    ///
    /// On every non-approve exit, including propagated errors, the state is
    /// rolled back to its pre-cycle value.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] when a state write or transaction operation
    /// fails; the tentative writes are rolled back first.
    #[allow(
        clippy::too_many_lines,
        reason = "Maintain a single linear flow for ordered state updates and auditability."
    )]
    pub fn execute(
        &mut self,
        state: &mut DesignState,
        transactions: &mut TransactionManager,
        proposal: Proposal,
    ) -> Result<CycleResult, CycleError> {
        self.counter += 1;
        let cycle_id = CycleId::new(format!("cycle-{}", self.counter));
        let started = Instant::now();
        let timeout = Duration::try_from_secs_f64(self.config.timeout_seconds.max(0.0))
            .unwrap_or(Duration::from_secs(86_400));
        let deadline = started + timeout;

        let mut current = proposal;
        let mut iteration: u32 = 0;
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut final_result: Option<ValidationResult> = None;
        let mut success = false;
        let mut committed = false;
        let mut escalated = false;
        let mut escalation_reason = String::new();

        loop {
            if iteration >= self.config.max_iterations {
                escalated = true;
                escalation_reason =
                    format!("Max iterations ({}) reached", self.config.max_iterations);
                break;
            }
            if Instant::now() >= deadline {
                escalated = true;
                escalation_reason = format!(
                    "TIMEOUT: cycle deadline of {}s exceeded",
                    self.config.timeout_seconds
                );
                break;
            }

            iteration += 1;
            current.iteration = iteration;

            let transaction = if self.config.use_transactions {
                let description = format!("{cycle_id} iteration {iteration}");
                Some(
                    transactions
                        .begin(state, EXECUTOR_SOURCE, &description, IsolationLevel::default())
                        .map_err(|source| CycleError::Transaction {
                            cycle_id: cycle_id.clone(),
                            source,
                        })?,
                )
            } else {
                None
            };

            if let Err(source) = Self::apply_changes(state, transactions, &current) {
                Self::abandon(state, transactions, transaction.is_some());
                return Err(CycleError::State {
                    cycle_id,
                    source,
                });
            }

            current.status = ProposalStatus::Validating;
            let request = ValidationRequest {
                request_id: RequestId::new(format!("{cycle_id}-req-{iteration}")),
                proposal: current.clone(),
                validators_to_run: Vec::new(),
                phase: current.phase,
                strict_mode: self.config.strict_mode,
                created_at: Timestamp::Logical(u64::from(iteration)),
            };
            let result = self.validator.validate(&request);

            let mut decision = match &mut self.decider {
                Some(decider) => decider.decide(&current, &result),
                None => auto_decision(&current, &result),
            };
            if decision.decision == DecisionKind::Approve && result.has_critical() {
                decision.decision = DecisionKind::Escalate;
                decision.escalation_reason =
                    "critical findings block approval".to_string();
            }

            history.push(IterationRecord {
                iteration,
                proposal_id: current.proposal_id.clone(),
                validation_passed: result.passed,
                error_count: result.error_count,
                warning_count: result.warning_count,
                decision: decision.decision,
            });
            final_result = Some(result);

            match decision.decision {
                DecisionKind::Approve => {
                    if let Some(id) = &transaction {
                        transactions.commit(state, Some(id)).map_err(|source| {
                            CycleError::Transaction {
                                cycle_id: cycle_id.clone(),
                                source,
                            }
                        })?;
                    }
                    current.status = ProposalStatus::Approved;
                    success = true;
                    committed = self.config.auto_commit;
                    break;
                }
                DecisionKind::Revise => {
                    Self::abandon(state, transactions, transaction.is_some());
                    current = Self::create_revision(&current, decision.revision_changes);
                }
                DecisionKind::Escalate => {
                    self.finish_failure(state, transactions, transaction.is_some());
                    escalated = true;
                    escalation_reason = if decision.escalation_reason.is_empty() {
                        "escalated by decision policy".to_string()
                    } else {
                        decision.escalation_reason
                    };
                    current.status = ProposalStatus::Escalated;
                    break;
                }
                DecisionKind::Abort => {
                    self.finish_failure(state, transactions, transaction.is_some());
                    current.status = ProposalStatus::Rejected;
                    break;
                }
            }
        }

        Ok(CycleResult {
            cycle_id,
            final_proposal: current,
            final_result,
            iterations: iteration,
            total_duration_ms: started.elapsed().as_secs_f64() * 1_000.0,
            success,
            committed,
            escalated,
            escalation_reason,
            history,
        })
    }

    /// Applies every proposal change tentatively, recording the change set.
    fn apply_changes(
        state: &mut DesignState,
        transactions: &mut TransactionManager,
        proposal: &Proposal,
    ) -> Result<(), StateError> {
        for change in &proposal.changes {
            let previous = state.get(&change.path).cloned();
            let source = if change.source.is_empty() {
                format!("proposal:{}", proposal.proposal_id)
            } else {
                change.source.clone()
            };
            state.set(&change.path, change.new_value.clone(), &source)?;
            transactions.record_change(
                &change.path,
                previous.unwrap_or(Value::Null),
                change.new_value.clone(),
            );
        }
        Ok(())
    }

    /// Rolls back the active transaction, if one was opened.
    ///
    /// Rollback failures cannot be surfaced from non-approve exits already in
    /// flight; a finished or missing transaction leaves nothing to restore.
    fn abandon(state: &mut DesignState, transactions: &mut TransactionManager, opened: bool) {
        if opened {
            let _ = transactions.rollback(state, None);
        }
    }

    /// Closes the transaction on an escalate or abort exit.
    ///
    /// Rollback is the default; hosts that disable `rollback_on_failure`
    /// keep the tentative writes by committing instead.
    fn finish_failure(
        &self,
        state: &mut DesignState,
        transactions: &mut TransactionManager,
        opened: bool,
    ) {
        if !opened {
            return;
        }
        if self.config.rollback_on_failure {
            let _ = transactions.rollback(state, None);
        } else {
            let _ = transactions.commit(state, None);
        }
    }

    /// Synthesizes the next-iteration proposal from a revise decision.
    ///
    /// An empty revision change list re-submits the original changes.
    fn create_revision(original: &Proposal, changes: Vec<ParameterChange>) -> Proposal {
        let changes = if changes.is_empty() {
            original.changes.clone()
        } else {
            changes
        };
        Proposal {
            proposal_id: ProposalId::new(format!(
                "{}-r{}",
                original.proposal_id,
                original.iteration + 1
            )),
            agent_id: original.agent_id.clone(),
            created_at: original.created_at,
            phase: original.phase,
            iteration: original.iteration + 1,
            changes,
            status: ProposalStatus::Revised,
            reasoning: format!("Revision of {}", original.proposal_id),
            confidence: original.confidence,
            parent_id: Some(original.proposal_id.clone()),
        }
    }
}
