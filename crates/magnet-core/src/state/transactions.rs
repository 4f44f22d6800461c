// crates/magnet-core/src/state/transactions.rs
// ============================================================================
// Module: MAGNET Transaction Manager
// Description: Snapshot-backed atomic state updates with single-writer rule.
// Purpose: Provide begin/commit/rollback semantics over the design state.
// Dependencies: crate::core, crate::state::store, serde
// ============================================================================

//! ## Overview
//! The transaction manager wraps the design state's snapshot primitives with
//! begin/commit/rollback bookkeeping. Exactly one transaction may be active
//! per manager; the single-writer rule is what makes the isolation labels
//! behave serializably today. A scoped [`TransactionGuard`] rolls back on
//! drop unless committed, which keeps the protocol layer's rollback
//! discipline structural rather than conventional.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ErrorEnvelope;
use crate::core::ErrorKind;
use crate::core::ParamPath;
use crate::core::Timestamp;
use crate::core::ToEnvelope;
use crate::core::TransactionId;
use crate::core::Value;
use crate::state::store::DesignState;
use crate::state::store::StateSnapshot;

// ============================================================================
// SECTION: Isolation Levels
// ============================================================================

/// Transaction isolation levels.
///
/// Levels are labels consumed by future multi-writer extensions; the current
/// contract guarantees serializable behavior by enforcing a single writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Transactions can see uncommitted changes from other transactions.
    ReadUncommitted,
    /// Transactions only see committed changes.
    #[default]
    ReadCommitted,
    /// Repeated reads within a transaction return the same results.
    RepeatableRead,
    /// Transactions are completely isolated.
    Serializable,
}

impl IsolationLevel {
    /// Returns true when the level tolerates dirty reads.
    #[must_use]
    pub const fn allows_dirty_reads(self) -> bool {
        matches!(self, Self::ReadUncommitted)
    }

    /// Returns true when the level prevents phantom reads.
    #[must_use]
    pub const fn prevents_phantom_reads(self) -> bool {
        matches!(self, Self::Serializable)
    }
}

// ============================================================================
// SECTION: Transaction Records
// ============================================================================

/// Transaction lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Open and accepting writes.
    Active,
    /// Committed; the snapshot is discarded.
    Committed,
    /// Rolled back; the snapshot was restored.
    RolledBack,
    /// Failed during commit or rollback.
    Failed,
}

/// Old and new value captured for one changed path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Value before the first write in the transaction.
    pub old: Value,
    /// Latest value written in the transaction.
    pub new: Value,
}

/// Record of one transaction's lifecycle and change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction identifier (`txn-N`).
    pub transaction_id: TransactionId,
    /// Lifecycle state.
    pub state: TransactionState,
    /// Requested isolation level.
    pub isolation_level: IsolationLevel,
    /// Logical time at begin.
    pub started_at: Timestamp,
    /// Logical time at commit or rollback, when finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Source tag of the caller that opened the transaction.
    pub source: String,
    /// Free-form description.
    pub description: String,
    /// Caller-recorded change set: path to (old, new).
    pub changes: BTreeMap<ParamPath, ChangeRecord>,
    /// Full-state snapshot held while active; dropped on completion.
    #[serde(skip)]
    snapshot: Option<StateSnapshot>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// A transaction is already active on this manager.
    #[error("transaction {0} already active; commit or rollback before starting a new one")]
    AlreadyActive(TransactionId),
    /// The referenced transaction does not exist.
    #[error("transaction not found: {0}")]
    NotFound(TransactionId),
    /// The referenced transaction is not active.
    #[error("transaction {id} is not active: {state:?}")]
    NotActive {
        /// The referenced transaction.
        id: TransactionId,
        /// Its current lifecycle state.
        state: TransactionState,
    },
    /// No transaction is active and none was named.
    #[error("no active transaction")]
    NoActiveTransaction,
}

impl ToEnvelope for TransactionError {
    fn to_envelope(&self) -> ErrorEnvelope {
        let code = match self {
            Self::AlreadyActive(_) => "transaction_active",
            Self::NotFound(_) => "transaction_not_found",
            Self::NotActive { .. } => "transaction_not_active",
            Self::NoActiveTransaction => "no_active_transaction",
        };
        ErrorEnvelope::new(
            ErrorKind::State,
            code,
            self.to_string(),
            "Finish the active transaction before issuing further transaction calls.",
        )
    }
}

// ============================================================================
// SECTION: Transaction Manager
// ============================================================================

/// Manager enforcing the single-writer transaction rule over a design state.
#[derive(Debug, Default)]
pub struct TransactionManager {
    /// All transaction records, keyed by identifier.
    transactions: BTreeMap<TransactionId, TransactionRecord>,
    /// Identifier of the active transaction, if any.
    active: Option<TransactionId>,
    /// Monotonic counter for identifier derivation.
    counter: u64,
}

impl TransactionManager {
    /// Creates an empty transaction manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new transaction, snapshotting the state for rollback.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::AlreadyActive`] when a transaction is open.
    pub fn begin(
        &mut self,
        state: &DesignState,
        source: &str,
        description: &str,
        isolation: IsolationLevel,
    ) -> Result<TransactionId, TransactionError> {
        if let Some(active) = &self.active {
            return Err(TransactionError::AlreadyActive(active.clone()));
        }

        self.counter += 1;
        let transaction_id = TransactionId::new(format!("txn-{}", self.counter));
        let record = TransactionRecord {
            transaction_id: transaction_id.clone(),
            state: TransactionState::Active,
            isolation_level: isolation,
            started_at: Timestamp::Logical(state.tick()),
            completed_at: None,
            source: source.to_string(),
            description: description.to_string(),
            changes: BTreeMap::new(),
            snapshot: Some(state.snapshot()),
        };
        self.transactions.insert(transaction_id.clone(), record);
        self.active = Some(transaction_id.clone());
        Ok(transaction_id)
    }

    /// Commits a transaction, discarding its snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the transaction is missing, not
    /// active, or no transaction was named while none is active.
    pub fn commit(
        &mut self,
        state: &DesignState,
        transaction_id: Option<&TransactionId>,
    ) -> Result<(), TransactionError> {
        let id = self.resolve(transaction_id)?;
        let record = self.active_record(&id)?;
        record.state = TransactionState::Committed;
        record.completed_at = Some(Timestamp::Logical(state.tick()));
        record.snapshot = None;
        if self.active.as_ref() == Some(&id) {
            self.active = None;
        }
        Ok(())
    }

    /// Rolls a transaction back, restoring the snapshot into the state.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the transaction is missing, not
    /// active, or no transaction was named while none is active.
    pub fn rollback(
        &mut self,
        state: &mut DesignState,
        transaction_id: Option<&TransactionId>,
    ) -> Result<(), TransactionError> {
        let id = self.resolve(transaction_id)?;
        let record = self.active_record(&id)?;
        if let Some(snapshot) = record.snapshot.take() {
            state.restore(snapshot);
        }
        record.state = TransactionState::RolledBack;
        record.completed_at = Some(Timestamp::Logical(state.tick()));
        if self.active.as_ref() == Some(&id) {
            self.active = None;
        }
        Ok(())
    }

    /// Records a change against the active transaction.
    ///
    /// The first record for a path keeps its old value; later records only
    /// advance the new value. A no-op when no transaction is active.
    pub fn record_change(&mut self, path: &ParamPath, old: Value, new: Value) {
        let Some(active) = &self.active else {
            return;
        };
        let Some(record) = self.transactions.get_mut(active) else {
            return;
        };
        record
            .changes
            .entry(path.clone())
            .and_modify(|change| change.new = new.clone())
            .or_insert(ChangeRecord {
                old,
                new,
            });
    }

    /// Returns true when a transaction is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Returns the active transaction record, if any.
    #[must_use]
    pub fn active_transaction(&self) -> Option<&TransactionRecord> {
        self.active.as_ref().and_then(|id| self.transactions.get(id))
    }

    /// Returns a transaction record by identifier.
    #[must_use]
    pub fn transaction(&self, transaction_id: &TransactionId) -> Option<&TransactionRecord> {
        self.transactions.get(transaction_id)
    }

    /// Returns all transaction records, ordered by identifier.
    pub fn all_transactions(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.transactions.values()
    }

    /// Clears finished transaction history, optionally keeping the active one.
    pub fn clear_history(&mut self, keep_active: bool) {
        if keep_active {
            let active = self.active.clone();
            self.transactions.retain(|id, _| Some(id) == active.as_ref());
        } else {
            self.transactions.clear();
            self.active = None;
        }
    }

    /// Resolves an optional transaction reference to a concrete identifier.
    fn resolve(
        &self,
        transaction_id: Option<&TransactionId>,
    ) -> Result<TransactionId, TransactionError> {
        transaction_id
            .or(self.active.as_ref())
            .cloned()
            .ok_or(TransactionError::NoActiveTransaction)
    }

    /// Fetches a record and checks it is still active.
    fn active_record(
        &mut self,
        id: &TransactionId,
    ) -> Result<&mut TransactionRecord, TransactionError> {
        let record = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| TransactionError::NotFound(id.clone()))?;
        if record.state != TransactionState::Active {
            return Err(TransactionError::NotActive {
                id: id.clone(),
                state: record.state,
            });
        }
        Ok(record)
    }
}

// ============================================================================
// SECTION: Transaction Guard
// ============================================================================

/// Scoped transaction over (manager, state) that rolls back on drop.
///
/// Call [`TransactionGuard::commit`] to keep the writes; dropping the guard
/// without committing restores the snapshot taken at begin.
pub struct TransactionGuard<'a> {
    /// Manager owning the transaction bookkeeping.
    manager: &'a mut TransactionManager,
    /// State the transaction writes into.
    state: &'a mut DesignState,
    /// The guarded transaction.
    transaction_id: TransactionId,
    /// Set once commit or rollback ran.
    finished: bool,
}

impl<'a> TransactionGuard<'a> {
    /// Opens a guarded transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::AlreadyActive`] when a transaction is open.
    pub fn begin(
        manager: &'a mut TransactionManager,
        state: &'a mut DesignState,
        source: &str,
        description: &str,
        isolation: IsolationLevel,
    ) -> Result<Self, TransactionError> {
        let transaction_id = manager.begin(state, source, description, isolation)?;
        Ok(Self {
            manager,
            state,
            transaction_id,
            finished: false,
        })
    }

    /// Returns the guarded transaction identifier.
    #[must_use]
    pub const fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Returns the guarded state.
    #[must_use]
    pub fn state(&self) -> &DesignState {
        self.state
    }

    /// Returns the guarded state mutably for tentative writes.
    pub fn state_mut(&mut self) -> &mut DesignState {
        self.state
    }

    /// Records a change against the guarded transaction.
    pub fn record_change(&mut self, path: &ParamPath, old: Value, new: Value) {
        self.manager.record_change(path, old, new);
    }

    /// Commits the guarded transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the transaction is no longer active.
    pub fn commit(mut self) -> Result<(), TransactionError> {
        self.finished = true;
        let id = self.transaction_id.clone();
        self.manager.commit(self.state, Some(&id))
    }

    /// Rolls the guarded transaction back explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the transaction is no longer active.
    pub fn rollback(mut self) -> Result<(), TransactionError> {
        self.finished = true;
        let id = self.transaction_id.clone();
        self.manager.rollback(self.state, Some(&id))
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let id = self.transaction_id.clone();
            // The drop path cannot surface errors; a missing or finished
            // transaction means there is nothing left to roll back.
            let _ = self.manager.rollback(self.state, Some(&id));
        }
    }
}
