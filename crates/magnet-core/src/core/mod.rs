// crates/magnet-core/src/core/mod.rs
// ============================================================================
// Module: MAGNET Core Types
// Description: Canonical identifiers, values, phases, time, and error envelope.
// Purpose: Provide stable, serializable foundation types for the MAGNET core.
// Dependencies: serde, serde_jcs, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Core types define the vocabulary shared by the state store, dependency
//! engine, and protocol layers: typed identifiers and parameter paths, the
//! tagged parameter value, the phase tables, deterministic timestamps, the
//! determinization pass, and the cross-cutting error envelope.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod canon;
pub mod errors;
pub mod identifiers;
pub mod phase;
pub mod time;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use canon::CanonError;
pub use canon::DEFAULT_FLOAT_PRECISION;
pub use canon::canonical_bytes;
pub use canon::canonical_string;
pub use canon::hash_bytes;
pub use canon::hash_canonical;
pub use canon::round_floats;
pub use errors::ErrorDetail;
pub use errors::ErrorEnvelope;
pub use errors::ErrorKind;
pub use errors::ToEnvelope;
pub use identifiers::AgentId;
pub use identifiers::CycleId;
pub use identifiers::DecisionId;
pub use identifiers::EntryId;
pub use identifiers::EscalationId;
pub use identifiers::EventId;
pub use identifiers::ParamPath;
pub use identifiers::ProposalId;
pub use identifiers::RequestId;
pub use identifiers::TransactionId;
pub use identifiers::ValidatorId;
pub use phase::ALL_PHASES;
pub use phase::Phase;
pub use phase::parameter_dependencies;
pub use phase::parameters_for_phase;
pub use phase::phase_for_parameter;
pub use time::Timestamp;
pub use value::Value;
