// crates/magnet-core/src/core/canon.rs
// ============================================================================
// Module: MAGNET Canonical Serialization
// Description: Determinization pass and content hashing for exported JSON.
// Purpose: Guarantee byte-identical exports for semantically identical inputs.
// Dependencies: serde, serde_jcs, serde_json, sha2
// ============================================================================

//! ## Overview
//! Every JSON artifact the core emits (trigger-log exports, state exports,
//! escalation requests) passes through the same determinization pass: floats
//! rounded to a configured precision, mapping keys sorted by RFC 8785
//! canonicalization. Content hashes are SHA-256 over those canonical bytes,
//! so two runs with identical semantic inputs hash identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default float precision (decimal places) for canonical exports.
pub const DEFAULT_FLOAT_PRECISION: u32 = 6;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while producing canonical JSON.
#[derive(Debug, Error)]
pub enum CanonError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Determinization
// ============================================================================

/// Rounds every float in a JSON tree to `precision` decimal places, in place.
///
/// Integral results re-encode as integers when exact, so `6.0` and `6`
/// serialize identically regardless of which form the caller supplied.
pub fn round_floats(value: &mut serde_json::Value, precision: u32) {
    match value {
        serde_json::Value::Number(number) => {
            if number.as_i64().is_none() && number.as_u64().is_none() {
                if let Some(float) = number.as_f64() {
                    let rounded = round_to(float, precision);
                    if let Some(encoded) = encode_float(rounded) {
                        *value = encoded;
                    }
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                round_floats(item, precision);
            }
        }
        serde_json::Value::Object(entries) => {
            for item in entries.values_mut() {
                round_floats(item, precision);
            }
        }
        serde_json::Value::Null | serde_json::Value::Bool(_) | serde_json::Value::String(_) => {}
    }
}

/// Rounds a float to `precision` decimal places.
#[must_use]
fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Encodes a rounded float back into a JSON number.
///
/// Exact integral values within `i64` range become integers so the canonical
/// form is independent of the source representation.
fn encode_float(value: f64) -> Option<serde_json::Value> {
    #[allow(clippy::cast_possible_truncation, reason = "Bounds-checked before the cast.")]
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Some(serde_json::Value::Number((value as i64).into()));
    }
    serde_json::Number::from_f64(value).map(serde_json::Value::Number)
}

/// Produces the determinized canonical JSON bytes for a serializable value.
///
/// # Errors
///
/// Returns [`CanonError::Canonicalization`] when serialization fails.
pub fn canonical_bytes<T: Serialize + ?Sized>(
    value: &T,
    precision: u32,
) -> Result<Vec<u8>, CanonError> {
    let mut tree = serde_json::to_value(value)
        .map_err(|err| CanonError::Canonicalization(err.to_string()))?;
    round_floats(&mut tree, precision);
    serde_jcs::to_vec(&tree).map_err(|err| CanonError::Canonicalization(err.to_string()))
}

/// Produces the determinized canonical JSON string for a serializable value.
///
/// # Errors
///
/// Returns [`CanonError::Canonicalization`] when serialization fails.
pub fn canonical_string<T: Serialize + ?Sized>(
    value: &T,
    precision: u32,
) -> Result<String, CanonError> {
    let bytes = canonical_bytes(value, precision)?;
    String::from_utf8(bytes).map_err(|err| CanonError::Canonicalization(err.to_string()))
}

// ============================================================================
// SECTION: Content Hashing
// ============================================================================

/// Hashes a serializable value over its determinized canonical JSON bytes.
///
/// # Errors
///
/// Returns [`CanonError::Canonicalization`] when serialization fails.
pub fn hash_canonical<T: Serialize + ?Sized>(
    value: &T,
    precision: u32,
) -> Result<String, CanonError> {
    let bytes = canonical_bytes(value, precision)?;
    Ok(hash_bytes(&bytes))
}

/// Hashes raw bytes with SHA-256, returning lowercase hex.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
