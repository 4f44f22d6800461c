// crates/magnet-core/src/state/store.rs
// ============================================================================
// Module: MAGNET Design State Store
// Description: Hierarchical key-value design state with mandatory provenance.
// Purpose: Hold the canonical design state and audit every write.
// Dependencies: crate::core, crate::state::trigger_log, serde_json
// ============================================================================

//! ## Overview
//! The design state is a hierarchical mapping addressed by dotted parameter
//! paths. Every write carries a non-empty source tag and appends exactly one
//! `VALUE_SET` entry to the embedded trigger log. The store exposes the
//! snapshot primitives the transaction manager builds on and a canonical
//! export with deterministic bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::CanonError;
use crate::core::DEFAULT_FLOAT_PRECISION;
use crate::core::ErrorEnvelope;
use crate::core::ErrorKind;
use crate::core::ParamPath;
use crate::core::Timestamp;
use crate::core::ToEnvelope;
use crate::core::Value;
use crate::core::hash_canonical;
use crate::state::trigger_log::TriggerLog;
use crate::state::trigger_log::TriggerLogError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by design state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// A write was attempted without a source tag.
    #[error("state write requires a non-empty source")]
    SourceMissing,
    /// A path with no segments was supplied.
    #[error("parameter path is empty")]
    EmptyPath,
    /// A non-mapping value sits in the middle of the path.
    #[error("path conflict at segment '{segment}' of '{path}': existing value is not a mapping")]
    PathConflict {
        /// The full path being written.
        path: ParamPath,
        /// The segment whose existing value blocks descent.
        segment: String,
    },
    /// The supplied root document is not a mapping.
    #[error("design state root must be a mapping")]
    RootNotMap,
    /// Canonical serialization failed.
    #[error(transparent)]
    Canon(#[from] CanonError),
    /// Trigger log append failed.
    #[error(transparent)]
    Log(#[from] TriggerLogError),
}

impl ToEnvelope for StateError {
    fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            Self::SourceMissing => ErrorEnvelope::new(
                ErrorKind::State,
                "source_missing",
                self.to_string(),
                "Tag the write with the calling module, e.g. protocol/cycle_executor.",
            ),
            Self::EmptyPath => ErrorEnvelope::new(
                ErrorKind::State,
                "empty_path",
                self.to_string(),
                "Address a leaf with a dotted path such as hull.beam.",
            ),
            Self::PathConflict { .. } => ErrorEnvelope::new(
                ErrorKind::State,
                "path_conflict",
                self.to_string(),
                "Remove or rename the conflicting scalar before writing below it.",
            ),
            Self::RootNotMap => ErrorEnvelope::new(
                ErrorKind::State,
                "root_not_map",
                self.to_string(),
                "Load the state from a phase-rooted mapping document.",
            ),
            Self::Canon(err) => ErrorEnvelope::new(
                ErrorKind::State,
                "canonicalization",
                err.to_string(),
                "Check the state for non-finite floats before exporting.",
            ),
            Self::Log(err) => ErrorEnvelope::new(
                ErrorKind::State,
                "trigger_log",
                err.to_string(),
                "Check the trigger log destination and source tags.",
            ),
        }
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Opaque snapshot handle produced by [`DesignState::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Deep copy of the state root at snapshot time.
    root: BTreeMap<String, Value>,
    /// Logical clock value at snapshot time.
    tick: u64,
}

// ============================================================================
// SECTION: Design State
// ============================================================================

/// Hierarchical design state with mandatory write provenance.
#[derive(Debug, Clone)]
pub struct DesignState {
    /// Root mapping of the hierarchical state.
    root: BTreeMap<String, Value>,
    /// Embedded audit log; every write appends exactly one entry.
    log: TriggerLog,
    /// Monotonic logical clock stamped on writes without explicit time.
    tick: u64,
    /// Float precision applied on canonical export.
    precision: u32,
}

impl Default for DesignState {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignState {
    /// Creates an empty design state with a default-capacity trigger log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: BTreeMap::new(),
            log: TriggerLog::new(),
            tick: 0,
            precision: DEFAULT_FLOAT_PRECISION,
        }
    }

    /// Creates a design state with an explicit trigger log.
    #[must_use]
    pub fn with_log(log: TriggerLog) -> Self {
        Self {
            root: BTreeMap::new(),
            log,
            tick: 0,
            precision: DEFAULT_FLOAT_PRECISION,
        }
    }

    /// Returns the current logical clock value.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Returns the embedded trigger log.
    #[must_use]
    pub const fn trigger_log(&self) -> &TriggerLog {
        &self.log
    }

    /// Returns the embedded trigger log mutably.
    pub fn trigger_log_mut(&mut self) -> &mut TriggerLog {
        &mut self.log
    }

    /// Resolves a dotted path to a value, if present.
    #[must_use]
    pub fn get(&self, path: &ParamPath) -> Option<&Value> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolves a dotted path, returning `default` for absent leaves.
    #[must_use]
    pub fn get_or<'a>(&'a self, path: &ParamPath, default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// Writes a value at a dotted path, stamping the store's logical clock.
    ///
    /// Intermediate mappings are created as needed. Exactly one `VALUE_SET`
    /// trigger entry is appended. Returns the prior value at the leaf.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::SourceMissing`] for an empty source,
    /// [`StateError::EmptyPath`] for an empty path, and
    /// [`StateError::PathConflict`] when a non-mapping value blocks descent.
    pub fn set(
        &mut self,
        path: &ParamPath,
        value: Value,
        source: &str,
    ) -> Result<Option<Value>, StateError> {
        self.tick += 1;
        let timestamp = Timestamp::Logical(self.tick);
        self.set_inner(path, value, source, timestamp, BTreeMap::new())
    }

    /// Writes a value at a dotted path with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`DesignState::set`].
    pub fn set_at(
        &mut self,
        path: &ParamPath,
        value: Value,
        source: &str,
        timestamp: Timestamp,
    ) -> Result<Option<Value>, StateError> {
        self.set_inner(path, value, source, timestamp, BTreeMap::new())
    }

    /// Legacy write entry point: alias of [`DesignState::set`] with the agent
    /// as the source and the note carried in entry metadata.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`DesignState::set`].
    pub fn write(
        &mut self,
        path: &ParamPath,
        value: Value,
        agent: &str,
        note: &str,
    ) -> Result<Option<Value>, StateError> {
        self.tick += 1;
        let timestamp = Timestamp::Logical(self.tick);
        let mut metadata = BTreeMap::new();
        if !note.is_empty() {
            metadata.insert("note".to_string(), Value::Str(note.to_string()));
        }
        self.set_inner(path, value, agent, timestamp, metadata)
    }

    /// Shared write path behind `set`, `set_at`, and `write`.
    fn set_inner(
        &mut self,
        path: &ParamPath,
        value: Value,
        source: &str,
        timestamp: Timestamp,
        metadata: BTreeMap<String, Value>,
    ) -> Result<Option<Value>, StateError> {
        if source.is_empty() {
            return Err(StateError::SourceMissing);
        }
        if path.is_empty() {
            return Err(StateError::EmptyPath);
        }

        let segments: Vec<&str> = path.segments().collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(StateError::EmptyPath);
        }

        let mut current = &mut self.root;
        for segment in &segments[..segments.len() - 1] {
            let slot = current
                .entry((*segment).to_string())
                .or_insert_with(Value::empty_map);
            current = match slot {
                Value::Map(entries) => entries,
                _ => {
                    return Err(StateError::PathConflict {
                        path: path.clone(),
                        segment: (*segment).to_string(),
                    });
                }
            };
        }

        let leaf = segments[segments.len() - 1].to_string();
        let previous = current.insert(leaf, value.clone());

        self.log.log_value_set(
            path.clone(),
            previous.clone(),
            value,
            source,
            metadata,
            timestamp,
        )?;
        Ok(previous)
    }

    /// Takes a deep snapshot of the state for later [`DesignState::restore`].
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            root: self.root.clone(),
            tick: self.tick,
        }
    }

    /// Restores the state values captured by a snapshot.
    ///
    /// The trigger log is not rewound: tentative writes remain audited even
    /// after their transaction rolls back.
    pub fn restore(&mut self, snapshot: StateSnapshot) {
        self.root = snapshot.root;
        self.tick = snapshot.tick;
    }

    /// Returns the state as a canonical nested mapping value.
    #[must_use]
    pub fn to_dict(&self) -> Value {
        Value::Map(self.root.clone())
    }

    /// Replaces the state values from a canonical mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::RootNotMap`] when the document is not a mapping.
    pub fn from_dict(&mut self, document: Value) -> Result<(), StateError> {
        match document {
            Value::Map(entries) => {
                self.root = entries;
                Ok(())
            }
            _ => Err(StateError::RootNotMap),
        }
    }

    /// Renders the state as determinized canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Canon`] when serialization fails.
    pub fn canonical_json(&self) -> Result<String, StateError> {
        Ok(crate::core::canonical_string(&self.to_dict(), self.precision)?)
    }

    /// Renders an export document with the `_export` envelope attached.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Canon`] when serialization fails.
    pub fn export_state(
        &self,
        version: &str,
        exported_at: Timestamp,
    ) -> Result<String, StateError> {
        let mut document = self.root.clone();
        let mut envelope = BTreeMap::new();
        envelope.insert("format".to_string(), Value::Str("magnet-state".to_string()));
        envelope.insert("timestamp".to_string(), Value::Str(exported_at.to_export_string()));
        envelope.insert("version".to_string(), Value::Str(version.to_string()));
        document.insert("_export".to_string(), Value::Map(envelope));
        Ok(crate::core::canonical_string(&Value::Map(document), self.precision)?)
    }

    /// Computes the SHA-256 content hash of the determinized state.
    ///
    /// Volatile timestamp keys (`created_at`, `updated_at`, `timestamp`,
    /// `modified_at`) and the `_export` envelope are excluded so replays of
    /// the same design hash identically.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Canon`] when serialization fails.
    pub fn canonical_hash(&self) -> Result<String, StateError> {
        let filtered = filter_volatile(&Value::Map(self.root.clone()));
        Ok(hash_canonical(&filtered, self.precision)?)
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Keys excluded from content hashing.
const VOLATILE_KEYS: [&str; 5] = ["created_at", "updated_at", "timestamp", "modified_at", "_export"];

/// Recursively drops volatile keys from a value tree.
fn filter_volatile(value: &Value) -> Value {
    match value {
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .filter(|(key, _)| !VOLATILE_KEYS.contains(&key.as_str()))
                .map(|(key, item)| (key.clone(), filter_volatile(item)))
                .collect(),
        ),
        Value::Seq(items) => Value::Seq(items.iter().map(filter_volatile).collect()),
        other => other.clone(),
    }
}
