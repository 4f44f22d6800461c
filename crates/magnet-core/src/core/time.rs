// crates/magnet-core/src/core/time.rs
// ============================================================================
// Module: MAGNET Time Model
// Description: Canonical timestamp representations for audit and protocol records.
// Purpose: Provide deterministic, replayable time values across MAGNET records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! MAGNET records carry explicit time values supplied by callers or derived
//! from a per-store logical tick; the core never reads wall-clock time for
//! record content. Wall-clock timestamps render as RFC 3339 UTC strings in
//! canonical exports, logical ticks render as `logical:N`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in MAGNET audit and protocol records.
///
/// # Invariants
/// - Values are explicitly provided by callers or derived from a store-local
///   monotonic tick; monotonicity across stores is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Renders the timestamp for canonical exports.
    ///
    /// Unix timestamps render as RFC 3339 UTC; logical ticks render as
    /// `logical:N`. Out-of-range unix values fall back to the raw millisecond
    /// count, which keeps exports total rather than failing the whole log.
    #[must_use]
    pub fn to_export_string(&self) -> String {
        match self {
            Self::UnixMillis(millis) => {
                let nanos = i128::from(*millis) * 1_000_000;
                OffsetDateTime::from_unix_timestamp_nanos(nanos)
                    .ok()
                    .and_then(|instant| instant.format(&Rfc3339).ok())
                    .unwrap_or_else(|| millis.to_string())
            }
            Self::Logical(tick) => format!("logical:{tick}"),
        }
    }
}
