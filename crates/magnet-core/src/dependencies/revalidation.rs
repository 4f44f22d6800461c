// crates/magnet-core/src/dependencies/revalidation.rs
// ============================================================================
// Module: MAGNET Revalidation Scheduler
// Description: Priority queue of validators awaiting re-execution.
// Purpose: Bridge the dependency engine to the validation pipeline.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Parameter changes queue validators for re-execution. The scheduler is a
//! min-heap ordered by (priority, queued-at, validator id); the trailing key
//! is a determinism tie-break. Each validator has at most one pending entry;
//! re-scheduling keeps whichever entry orders first. Pops feed an executor
//! callback, and post-run callbacks let observers react to completed runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::BinaryHeap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Timestamp;
use crate::core::ValidatorId;

// ============================================================================
// SECTION: Task
// ============================================================================

/// One queued validator re-execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidationTask {
    /// Validator to rerun.
    pub validator_id: ValidatorId,
    /// Priority; lower runs first.
    pub priority: u32,
    /// Queueing timestamp; earlier runs first within a priority.
    pub queued_at: Timestamp,
    /// Parameter or actor that triggered the rerun.
    pub triggered_by: String,
    /// Why the rerun was queued.
    pub reason: String,
}

impl RevalidationTask {
    /// Creates a task with empty attribution fields.
    #[must_use]
    pub fn new(validator_id: ValidatorId, priority: u32, queued_at: Timestamp) -> Self {
        Self {
            validator_id,
            priority,
            queued_at,
            triggered_by: String::new(),
            reason: String::new(),
        }
    }
}

impl PartialOrd for RevalidationTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RevalidationTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.queued_at.cmp(&other.queued_at))
            .then_with(|| self.validator_id.cmp(&other.validator_id))
    }
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Min-heap scheduler with at-most-one pending entry per validator.
pub struct RevalidationScheduler {
    /// Heap of queued tasks; may hold stale entries superseded in `pending`.
    heap: BinaryHeap<Reverse<RevalidationTask>>,
    /// Canonical pending task per validator.
    pending: BTreeMap<ValidatorId, RevalidationTask>,
    /// Count of tasks handed to the executor callback.
    processed: u64,
    /// Callbacks invoked after each executed task.
    post_run: Vec<Box<dyn FnMut(&RevalidationTask)>>,
}

impl Default for RevalidationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RevalidationScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: BTreeMap::new(),
            processed: 0,
            post_run: Vec::new(),
        }
    }

    /// Queues a task, keeping at most one pending entry per validator.
    ///
    /// When the validator already has a pending entry, whichever task orders
    /// first is kept. Returns true when the task became the pending entry.
    pub fn schedule(&mut self, task: RevalidationTask) -> bool {
        match self.pending.get(&task.validator_id) {
            Some(existing) if *existing <= task => false,
            _ => {
                self.pending.insert(task.validator_id.clone(), task.clone());
                self.heap.push(Reverse(task));
                true
            }
        }
    }

    /// Removes the pending entry for a validator, if any.
    pub fn remove_validator(&mut self, validator_id: &ValidatorId) -> bool {
        self.pending.remove(validator_id).is_some()
    }

    /// Returns the next task without executing it.
    pub fn peek_next(&mut self) -> Option<&RevalidationTask> {
        self.discard_stale();
        self.heap.peek().map(|Reverse(task)| task)
    }

    /// Pops the next task and feeds it to the executor callback.
    ///
    /// Post-run callbacks fire after the executor returns. Returns the
    /// executed task, or `None` when the queue is empty.
    pub fn run_next<E>(&mut self, executor: &mut E) -> Option<RevalidationTask>
    where
        E: FnMut(&RevalidationTask),
    {
        self.discard_stale();
        let Reverse(task) = self.heap.pop()?;
        self.pending.remove(&task.validator_id);
        executor(&task);
        self.processed += 1;
        for callback in &mut self.post_run {
            callback(&task);
        }
        Some(task)
    }

    /// Registers a callback invoked after each executed task.
    pub fn add_post_run_callback(&mut self, callback: Box<dyn FnMut(&RevalidationTask)>) {
        self.post_run.push(callback);
    }

    /// Returns the pending tasks in execution order.
    #[must_use]
    pub fn pending(&self) -> Vec<&RevalidationTask> {
        let mut tasks: Vec<&RevalidationTask> = self.pending.values().collect();
        tasks.sort();
        tasks
    }

    /// Returns true when a validator has a pending entry.
    #[must_use]
    pub fn is_pending(&self, validator_id: &ValidatorId) -> bool {
        self.pending.contains_key(validator_id)
    }

    /// Returns the number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true when no tasks are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of executed tasks.
    #[must_use]
    pub const fn processed_count(&self) -> u64 {
        self.processed
    }

    /// Drops every pending task.
    pub fn clear_queue(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }

    /// Pops heap entries superseded by rescheduling or removal.
    fn discard_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            let current = self.pending.get(&top.validator_id);
            if current == Some(top) {
                break;
            }
            self.heap.pop();
        }
    }
}
