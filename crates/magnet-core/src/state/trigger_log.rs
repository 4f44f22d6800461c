// crates/magnet-core/src/state/trigger_log.rs
// ============================================================================
// Module: MAGNET Trigger Log
// Description: Bounded, append-only audit trail of state and phase activity.
// Purpose: Record every write, invalidation, transition, and validation run.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The trigger log is the queryable audit of the design session: one entry per
//! state write, invalidation, phase transition, and validation run. Entries
//! are append-only and never mutated; the log is bounded by a configurable
//! capacity with optional time-based eviction. JSON export passes through the
//! shared determinization pass so identical semantic histories export as
//! byte-identical files.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::CanonError;
use crate::core::DEFAULT_FLOAT_PRECISION;
use crate::core::EntryId;
use crate::core::ParamPath;
use crate::core::Phase;
use crate::core::Timestamp;
use crate::core::Value;
use crate::core::ValidatorId;
use crate::core::canonical_string;

// ============================================================================
// SECTION: Entry Types
// ============================================================================

/// Kind of activity a trigger log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// A state value was written.
    ValueSet,
    /// A parameter or phase was invalidated.
    Invalidation,
    /// A phase changed lifecycle status.
    PhaseTransition,
    /// A validator executed.
    ValidationRun,
}

/// Single append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEntry {
    /// Entry identifier, counter-derived (`entry-N`).
    pub entry_id: EntryId,
    /// Entry timestamp.
    pub timestamp: Timestamp,
    /// Activity kind.
    pub trigger_type: TriggerType,
    /// Affected parameter, when parameter-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<ParamPath>,
    /// Affected phase, when phase-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Prior value for value writes, prior status for transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// New value for value writes, new status for transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// Non-empty tag identifying the caller that caused the entry.
    pub source: String,
    /// Free-form structured metadata.
    pub metadata: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Filter over trigger log entries; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TriggerQuery {
    /// Inclusive lower timestamp bound.
    pub since: Option<Timestamp>,
    /// Inclusive upper timestamp bound.
    pub until: Option<Timestamp>,
    /// Restrict to these parameters.
    pub parameters: Vec<ParamPath>,
    /// Restrict to these phases.
    pub phases: Vec<Phase>,
    /// Restrict to these activity kinds.
    pub trigger_types: Vec<TriggerType>,
}

impl TriggerQuery {
    /// Returns true when the entry matches every populated filter.
    fn matches(&self, entry: &TriggerEntry) -> bool {
        if self.since.is_some_and(|bound| entry.timestamp < bound) {
            return false;
        }
        if self.until.is_some_and(|bound| entry.timestamp > bound) {
            return false;
        }
        if !self.parameters.is_empty()
            && !entry.parameter.as_ref().is_some_and(|path| self.parameters.contains(path))
        {
            return false;
        }
        if !self.phases.is_empty()
            && !entry.phase.is_some_and(|phase| self.phases.contains(&phase))
        {
            return false;
        }
        if !self.trigger_types.is_empty() && !self.trigger_types.contains(&entry.trigger_type) {
            return false;
        }
        true
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by trigger log operations.
#[derive(Debug, Error)]
pub enum TriggerLogError {
    /// An entry was submitted without a source tag.
    #[error("trigger log entry requires a non-empty source")]
    SourceMissing,
    /// Export serialization failed.
    #[error(transparent)]
    Canon(#[from] CanonError),
    /// Export file write failed.
    #[error("trigger log export io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Trigger Log
// ============================================================================

/// Default maximum number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Bounded append-only audit log with deterministic export.
#[derive(Debug, Clone)]
pub struct TriggerLog {
    /// Retained entries, oldest first.
    entries: VecDeque<TriggerEntry>,
    /// Maximum retained entries; oldest drop first.
    capacity: usize,
    /// Monotonic entry counter for identifier derivation.
    counter: u64,
    /// Float precision applied on export.
    precision: u32,
}

impl Default for TriggerLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerLog {
    /// Creates a log with the default capacity and precision.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Creates a log with an explicit entry capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            counter: 0,
            precision: DEFAULT_FLOAT_PRECISION,
        }
    }

    /// Overrides the export float precision.
    #[must_use]
    pub const fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Records a state write.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerLogError::SourceMissing`] when `source` is empty.
    pub fn log_value_set(
        &mut self,
        parameter: ParamPath,
        old_value: Option<Value>,
        new_value: Value,
        source: &str,
        metadata: BTreeMap<String, Value>,
        timestamp: Timestamp,
    ) -> Result<EntryId, TriggerLogError> {
        self.append(TriggerType::ValueSet, Some(parameter), None, old_value, Some(new_value), source, metadata, timestamp)
    }

    /// Records an invalidation touching a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerLogError::SourceMissing`] when `source` is empty.
    pub fn log_invalidation(
        &mut self,
        parameter: ParamPath,
        source: &str,
        metadata: BTreeMap<String, Value>,
        timestamp: Timestamp,
    ) -> Result<EntryId, TriggerLogError> {
        self.append(TriggerType::Invalidation, Some(parameter), None, None, None, source, metadata, timestamp)
    }

    /// Records a phase lifecycle transition.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerLogError::SourceMissing`] when `source` is empty.
    pub fn log_phase_transition(
        &mut self,
        phase: Phase,
        from_state: &str,
        to_state: &str,
        source: &str,
        timestamp: Timestamp,
    ) -> Result<EntryId, TriggerLogError> {
        self.append(
            TriggerType::PhaseTransition,
            None,
            Some(phase),
            Some(Value::Str(from_state.to_string())),
            Some(Value::Str(to_state.to_string())),
            source,
            BTreeMap::new(),
            timestamp,
        )
    }

    /// Records a validator execution.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerLogError::SourceMissing`] when `source` is empty.
    pub fn log_validation_run(
        &mut self,
        validator_id: &ValidatorId,
        passed: bool,
        error_count: u32,
        warning_count: u32,
        source: &str,
        timestamp: Timestamp,
    ) -> Result<EntryId, TriggerLogError> {
        let mut metadata = BTreeMap::new();
        metadata.insert("validator_id".to_string(), Value::Str(validator_id.as_str().to_string()));
        metadata.insert("passed".to_string(), Value::Bool(passed));
        metadata.insert("error_count".to_string(), Value::Int(i64::from(error_count)));
        metadata.insert("warning_count".to_string(), Value::Int(i64::from(warning_count)));
        self.append(TriggerType::ValidationRun, None, None, None, None, source, metadata, timestamp)
    }

    /// Appends an entry, evicting the oldest when over capacity.
    #[allow(clippy::too_many_arguments, reason = "Internal assembly point for all entry kinds.")]
    fn append(
        &mut self,
        trigger_type: TriggerType,
        parameter: Option<ParamPath>,
        phase: Option<Phase>,
        old_value: Option<Value>,
        new_value: Option<Value>,
        source: &str,
        metadata: BTreeMap<String, Value>,
        timestamp: Timestamp,
    ) -> Result<EntryId, TriggerLogError> {
        if source.is_empty() {
            return Err(TriggerLogError::SourceMissing);
        }
        self.counter += 1;
        let entry_id = EntryId::new(format!("entry-{}", self.counter));
        self.entries.push_back(TriggerEntry {
            entry_id: entry_id.clone(),
            timestamp,
            trigger_type,
            parameter,
            phase,
            old_value,
            new_value,
            source: source.to_string(),
            metadata,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Ok(entry_id)
    }

    /// Returns entries matching the query, oldest first.
    #[must_use]
    pub fn query(&self, query: &TriggerQuery) -> Vec<&TriggerEntry> {
        self.entries.iter().filter(|entry| query.matches(entry)).collect()
    }

    /// Returns all retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &TriggerEntry> {
        self.entries.iter()
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries with timestamps strictly older than `cutoff`.
    pub fn evict_older_than(&mut self, cutoff: Timestamp) {
        self.entries.retain(|entry| entry.timestamp >= cutoff);
    }

    /// Clears all retained entries; the identifier counter keeps running.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Renders the retained entries as determinized canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerLogError::Canon`] when serialization fails.
    pub fn export_string(&self) -> Result<String, TriggerLogError> {
        let entries: Vec<&TriggerEntry> = self.entries.iter().collect();
        Ok(canonical_string(&entries, self.precision)?)
    }

    /// Writes the retained entries to a file as determinized canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerLogError::Canon`] on serialization failure or
    /// [`TriggerLogError::Io`] on write failure.
    pub fn export_json(&self, path: &Path) -> Result<(), TriggerLogError> {
        let rendered = self.export_string()?;
        fs::write(path, rendered).map_err(|err| TriggerLogError::Io(err.to_string()))
    }
}
