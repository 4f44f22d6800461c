// crates/magnet-core/src/core/errors.rs
// ============================================================================
// Module: MAGNET Error Taxonomy
// Description: Error-kind classification and the shared JSON error envelope.
// Purpose: Surface every core error uniformly in-process and over the wire.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Module errors stay strongly typed (`thiserror` enums per module); this
//! module provides the cross-cutting classification and the JSON envelope
//! `{error: {code, message, details, recovery_hint}}` used wherever errors
//! leave the process. Designer-actionable conditions travel as validation
//! findings instead and never appear here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Cross-cutting classification of MAGNET errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or out-of-range input parameters.
    ValidationInput,
    /// A physical domain rule was violated.
    PhysicsConstraint,
    /// State-layer failure: no initialization, transaction conflict, cycles.
    State,
    /// Cross-module inconsistency or unsatisfied prerequisite.
    Integration,
    /// Agent protocol failure: timeout or malformed proposal.
    AgentProtocol,
    /// Geometry pipeline failure: generation, LOD, export, resources.
    Geometry,
}

impl ErrorKind {
    /// Returns the canonical snake_case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationInput => "validation_input",
            Self::PhysicsConstraint => "physics_constraint",
            Self::State => "state",
            Self::Integration => "integration",
            Self::AgentProtocol => "agent_protocol",
            Self::Geometry => "geometry",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Error Envelope
// ============================================================================

/// Wire-format error payload carried inside the `error` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable machine-readable error code, e.g. `state/transaction_active`.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured detail payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// One-sentence remediation hint.
    pub recovery_hint: String,
}

/// JSON error envelope `{error: {...}}` emitted at process boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The enclosed error payload.
    pub error: ErrorDetail,
}

impl ErrorEnvelope {
    /// Builds an envelope from its parts.
    #[must_use]
    pub fn new(
        kind: ErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
        recovery_hint: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: format!("{}/{}", kind.as_str(), code.into()),
                message: message.into(),
                details: None,
                recovery_hint: recovery_hint.into(),
            },
        }
    }

    /// Attaches a structured detail payload.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

/// Conversion into the shared JSON error envelope.
///
/// Implemented by every module error enum whose failures cross a process
/// boundary; each variant supplies a stable code and a one-sentence
/// remediation.
pub trait ToEnvelope {
    /// Renders the error as a JSON error envelope.
    fn to_envelope(&self) -> ErrorEnvelope;
}
