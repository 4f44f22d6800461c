// crates/magnet-core/tests/escalation.rs
// ============================================================================
// Module: Escalation Handler Tests
// Description: Tests for escalation routing, response application, and queries.
// Purpose: Validate lookup priority and cycle-derived request levels.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Ensures responders route most-specific-first, responses mutate request
//! status, and requests derived from failed cycles carry level and context.

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

use magnet_core::AgentId;
use magnet_core::EscalationHandler;
use magnet_core::EscalationLevel;
use magnet_core::EscalationRequest;
use magnet_core::EscalationResponse;
use magnet_core::ParamPath;
use magnet_core::ParameterChange;
use magnet_core::Phase;
use magnet_core::Proposal;
use magnet_core::ProposalId;
use magnet_core::RequestId;
use magnet_core::Severity;
use magnet_core::Timestamp;
use magnet_core::ValidationFinding;
use magnet_core::ValidationResult;
use magnet_core::Value;
use magnet_core::ValidatorId;
use magnet_core::escalation_from_cycle;
use magnet_core::protocol::EscalationAction;
use magnet_core::protocol::EscalationStatus;

/// Builds a minimal open escalation request.
fn request(level: EscalationLevel, phase: Phase) -> EscalationRequest {
    EscalationRequest {
        escalation_id: magnet_core::EscalationId::new("esc-1"),
        proposal_id: ProposalId::new("prop-1"),
        agent_id: AgentId::new("agent-alpha"),
        phase,
        level,
        status: EscalationStatus::Open,
        rule_id: String::new(),
        reason: "unresolved".to_string(),
        description: String::new(),
        findings: Vec::new(),
        iterations_attempted: 3,
        context: std::collections::BTreeMap::new(),
        created_at: Timestamp::Logical(0),
        resolved_at: None,
        resolved_by: None,
        resolution_notes: String::new(),
    }
}

/// Builds a responder that answers with a fixed action and tag.
fn responder(
    tag: &'static str,
    action: EscalationAction,
) -> Box<dyn magnet_core::EscalationResponder> {
    Box::new(move |req: &EscalationRequest| {
        Some(EscalationResponse {
            escalation_id: req.escalation_id.clone(),
            handler_id: tag.to_string(),
            action,
            resolution: format!("handled by {tag}"),
            suggested_changes: Vec::new(),
            created_at: Timestamp::Logical(0),
        })
    })
}

/// Verifies the most specific registration wins.
#[test]
fn lookup_prefers_specific_registrations() {
    let mut handler = EscalationHandler::new();
    handler.register(None, None, responder("wildcard", EscalationAction::Dismissed));
    handler.register(
        Some(EscalationLevel::High),
        None,
        responder("level-only", EscalationAction::Deferred),
    );
    handler.register(
        Some(EscalationLevel::High),
        Some(Phase::Stability),
        responder("both", EscalationAction::Resolved),
    );

    let response = handler.handle(request(EscalationLevel::High, Phase::Stability)).unwrap();
    assert_eq!(response.handler_id, "both");

    let response = handler.handle(request(EscalationLevel::High, Phase::HullForm)).unwrap();
    assert_eq!(response.handler_id, "level-only");

    let response = handler.handle(request(EscalationLevel::Low, Phase::HullForm)).unwrap();
    assert_eq!(response.handler_id, "wildcard");
}

/// Verifies phase-only registrations match before the wildcard.
#[test]
fn phase_only_beats_wildcard() {
    let mut handler = EscalationHandler::new();
    handler.register(None, None, responder("wildcard", EscalationAction::Dismissed));
    handler.register(
        None,
        Some(Phase::HullForm),
        responder("phase-only", EscalationAction::Deferred),
    );

    let response = handler.handle(request(EscalationLevel::Low, Phase::HullForm)).unwrap();
    assert_eq!(response.handler_id, "phase-only");
}

/// Verifies the default responder catches unmatched requests.
#[test]
fn default_responder_catches_rest() {
    let mut handler = EscalationHandler::new();
    handler.set_default(responder("default", EscalationAction::Deferred));

    let response = handler.handle(request(EscalationLevel::Info, Phase::Mission)).unwrap();
    assert_eq!(response.handler_id, "default");
    assert_eq!(handler.open_escalations().len(), 0);
}

/// Verifies unhandled requests stay open in the log.
#[test]
fn unhandled_requests_stay_open() {
    let mut handler = EscalationHandler::new();
    let response = handler.handle(request(EscalationLevel::Low, Phase::Mission));
    assert!(response.is_none());
    assert_eq!(handler.open_escalations().len(), 1);
}

/// Verifies responses mutate request status and notes.
#[test]
fn responses_apply_to_logged_requests() {
    let mut handler = EscalationHandler::new();
    handler.register(None, None, responder("fixer", EscalationAction::Resolved));
    handler.handle(request(EscalationLevel::Medium, Phase::Weight));

    let logged = handler.escalations_by_level(EscalationLevel::Medium);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].status, EscalationStatus::Resolved);
    assert_eq!(logged[0].resolved_by.as_deref(), Some("fixer"));
    assert!(logged[0].resolution_notes.contains("fixer"));
    assert!(logged[0].resolved_at.is_some());
}

/// Verifies the summary counts statuses and levels.
#[test]
fn summary_counts() {
    let mut handler = EscalationHandler::new();
    handler.register(
        Some(EscalationLevel::High),
        None,
        responder("fixer", EscalationAction::Resolved),
    );
    handler.handle(request(EscalationLevel::High, Phase::Stability));
    handler.handle(request(EscalationLevel::Low, Phase::Mission));

    let summary = handler.summary();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.open, 1);
    assert_eq!(summary.by_level.get(&EscalationLevel::High), Some(&1));
    assert_eq!(summary.by_level.get(&EscalationLevel::Low), Some(&1));
}

/// Builds a failed validation result with the given number of errors.
fn failed_result(error_count: usize) -> ValidationResult {
    let findings = (0..error_count)
        .map(|index| ValidationFinding {
            validator_name: ValidatorId::new("hull/dimensions"),
            severity: Severity::Error,
            code: format!("RULE_{index}"),
            message: "violated".to_string(),
            path: Some(ParamPath::new("hull.beam")),
            actual_value: Some(Value::Float(6.0)),
            expected_value: None,
            suggestion: String::new(),
        })
        .collect();
    ValidationResult::from_findings(
        RequestId::new("req-1"),
        ProposalId::new("prop-1"),
        findings,
        vec![ValidatorId::new("hull/dimensions")],
        0.1,
    )
}

/// Builds the proposal used for cycle-derived requests.
fn failed_proposal() -> Proposal {
    Proposal::new(
        ProposalId::new("prop-1"),
        AgentId::new("agent-alpha"),
        Phase::HullForm,
        vec![ParameterChange::new(
            ParamPath::new("hull.beam"),
            Some(Value::Float(6.0)),
            Value::Float(6.5),
        )],
    )
}

/// Verifies level derivation from the error count.
#[test]
fn cycle_requests_derive_level_from_error_count() {
    let low = escalation_from_cycle(&failed_proposal(), &failed_result(1), "failed", 5);
    assert_eq!(low.level, EscalationLevel::Low);

    let medium = escalation_from_cycle(&failed_proposal(), &failed_result(2), "failed", 5);
    assert_eq!(medium.level, EscalationLevel::Medium);

    let high = escalation_from_cycle(&failed_proposal(), &failed_result(5), "failed", 5);
    assert_eq!(high.level, EscalationLevel::High);
}

/// Verifies cycle-derived requests embed proposal and result context.
#[test]
fn cycle_requests_embed_context() {
    let request = escalation_from_cycle(&failed_proposal(), &failed_result(2), "failed", 3);

    assert_eq!(request.proposal_id, ProposalId::new("prop-1"));
    assert_eq!(request.iterations_attempted, 3);
    assert_eq!(request.findings.len(), 2);
    assert_eq!(request.rule_id, "RULE_0");
    assert!(request.context.contains_key("proposal"));
    assert!(request.context.contains_key("validation_result"));
}
