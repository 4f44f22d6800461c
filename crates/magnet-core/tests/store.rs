// crates/magnet-core/tests/store.rs
// ============================================================================
// Module: Design State Store Tests
// Description: Tests for the hierarchical design state store.
// Purpose: Validate provenance, path walking, snapshots, and exports.
// Dependencies: magnet-core
// ============================================================================
//! ## Overview
//! Ensures writes require provenance, paths walk and create intermediates
//! correctly, and snapshot/restore round-trips the value tree byte-exactly.

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
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use magnet_core::DesignState;
use magnet_core::ParamPath;
use magnet_core::StateError;
use magnet_core::TriggerType;
use magnet_core::Value;

/// Verifies set then get round-trips a nested leaf.
#[test]
fn set_and_get_roundtrip() {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();

    let value = state.get(&ParamPath::new("hull.beam")).unwrap();
    assert_eq!(value, &Value::Float(6.0));
}

/// Verifies intermediate mappings are created as needed.
#[test]
fn set_creates_intermediate_mappings() {
    let mut state = DesignState::new();
    state
        .set(&ParamPath::new("systems.fuel.tank_count"), Value::Int(2), "test")
        .unwrap();

    let systems = state.get(&ParamPath::new("systems")).unwrap();
    assert!(matches!(systems, Value::Map(_)));
    let leaf = state.get(&ParamPath::new("systems.fuel.tank_count")).unwrap();
    assert_eq!(leaf, &Value::Int(2));
}

/// Verifies absent leaves resolve to the supplied default.
#[test]
fn get_or_returns_default_for_absent_leaf() {
    let state = DesignState::new();
    let default = Value::Float(1.4);
    let value = state.get_or(&ParamPath::new("hull.draft"), &default);
    assert_eq!(value, &default);
}

/// Verifies writes without a source are rejected.
#[test]
fn set_rejects_empty_source() {
    let mut state = DesignState::new();
    let result = state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "");
    assert!(matches!(result, Err(StateError::SourceMissing)));
}

/// Verifies writing below a scalar leaf is refused.
#[test]
fn set_rejects_path_through_scalar() {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();

    let result = state.set(&ParamPath::new("hull.beam.sub"), Value::Int(1), "test");
    assert!(matches!(result, Err(StateError::PathConflict { .. })));
    assert_eq!(state.get(&ParamPath::new("hull.beam")), Some(&Value::Float(6.0)));
}

/// Verifies each set appends exactly one VALUE_SET entry with the source.
#[test]
fn set_appends_one_trigger_entry_per_write() {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "hull/generator").unwrap();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.5), "hull/generator").unwrap();

    let entries: Vec<_> = state.trigger_log().entries().collect();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.trigger_type, TriggerType::ValueSet);
        assert_eq!(entry.source, "hull/generator");
    }
    assert_eq!(entries[1].old_value, Some(Value::Float(6.0)));
    assert_eq!(entries[1].new_value, Some(Value::Float(6.5)));
}

/// Verifies the legacy write alias shares the set code path.
#[test]
fn write_alias_logs_value_set_with_note() {
    let mut state = DesignState::new();
    state
        .write(&ParamPath::new("hull.beam"), Value::Float(6.5), "arrangement/generator", "widen")
        .unwrap();

    let entries: Vec<_> = state.trigger_log().entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trigger_type, TriggerType::ValueSet);
    assert_eq!(entries[0].source, "arrangement/generator");
    assert_eq!(entries[0].metadata.get("note"), Some(&Value::Str("widen".to_string())));
}

/// Verifies set returns the prior value at the leaf.
#[test]
fn set_returns_previous_value() {
    let mut state = DesignState::new();
    let first = state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();
    assert!(first.is_none());

    let second = state.set(&ParamPath::new("hull.beam"), Value::Float(6.5), "test").unwrap();
    assert_eq!(second, Some(Value::Float(6.0)));
}

/// Verifies snapshot then restore recovers the exact value tree.
#[test]
fn snapshot_restore_roundtrip() {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();
    let before = state.canonical_json().unwrap();

    let snapshot = state.snapshot();
    state.set(&ParamPath::new("hull.beam"), Value::Float(9.9), "test").unwrap();
    state.set(&ParamPath::new("hull.loa"), Value::Float(24.0), "test").unwrap();

    state.restore(snapshot);
    assert_eq!(state.canonical_json().unwrap(), before);
}

/// Verifies to_dict/from_dict round-trips the value tree.
#[test]
fn dict_roundtrip() {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();
    state.set(&ParamPath::new("mission.range_nm"), Value::Int(600), "test").unwrap();

    let document = state.to_dict();
    let mut restored = DesignState::new();
    restored.from_dict(document).unwrap();

    assert_eq!(restored.canonical_json().unwrap(), state.canonical_json().unwrap());
}

/// Verifies the export document carries the `_export` envelope.
#[test]
fn export_state_carries_envelope() {
    let mut state = DesignState::new();
    state.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();

    let exported = state
        .export_state("1.0", magnet_core::Timestamp::UnixMillis(1_700_000_000_000))
        .unwrap();
    assert!(exported.contains("\"_export\""));
    assert!(exported.contains("\"format\":\"magnet-state\""));
    assert!(exported.contains("\"version\":\"1.0\""));
}

/// Verifies the content hash ignores volatile timestamp keys.
#[test]
fn canonical_hash_ignores_volatile_keys() {
    let mut first = DesignState::new();
    first.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();
    first
        .set(&ParamPath::new("hull.updated_at"), Value::Str("2026-01-01".to_string()), "test")
        .unwrap();

    let mut second = DesignState::new();
    second.set(&ParamPath::new("hull.beam"), Value::Float(6.0), "test").unwrap();
    second
        .set(&ParamPath::new("hull.updated_at"), Value::Str("2026-06-30".to_string()), "test")
        .unwrap();

    assert_eq!(first.canonical_hash().unwrap(), second.canonical_hash().unwrap());
}

/// Verifies float rounding makes semantically equal states byte-identical.
#[test]
fn canonical_json_rounds_floats() {
    let mut first = DesignState::new();
    first.set(&ParamPath::new("hull.cb"), Value::Float(0.380_000_04), "test").unwrap();

    let mut second = DesignState::new();
    second.set(&ParamPath::new("hull.cb"), Value::Float(0.379_999_96), "test").unwrap();

    assert_eq!(first.canonical_json().unwrap(), second.canonical_json().unwrap());
}
