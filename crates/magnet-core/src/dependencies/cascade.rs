// crates/magnet-core/src/dependencies/cascade.rs
// ============================================================================
// Module: MAGNET Cascade Executor
// Description: Ordered recomputation of stale parameters.
// Purpose: Drive a recompute callback over the stale set in dependency order.
// Dependencies: crate::core, crate::dependencies, crate::interfaces, crate::state, serde
// ============================================================================

//! ## Overview
//! After invalidation, the cascade executor plans a recalculation order over
//! the stale set (or an explicit subset), walks it invoking a caller-supplied
//! recompute function per parameter, and collects per-parameter outcomes and
//! wall-clock durations. Failures either skip the remainder or continue,
//! according to configuration; recomputed parameters are marked valid.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ParamPath;
use crate::dependencies::graph::DependencyGraph;
use crate::dependencies::graph::GraphError;
use crate::dependencies::invalidation::InvalidationEngine;
use crate::interfaces::ParameterRecompute;
use crate::state::store::DesignState;

// ============================================================================
// SECTION: Plan and Result
// ============================================================================

/// Ordered recalculation plan over a set of stale parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationOrder {
    /// Parameters in dependency order.
    pub parameters: Vec<ParamPath>,
}

/// Aggregate outcome of one cascade run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    /// Parameters recomputed successfully, in execution order.
    pub succeeded: Vec<ParamPath>,
    /// Parameters whose recompute failed, with the failure message.
    pub failed: Vec<(ParamPath, String)>,
    /// Parameters skipped after an aborting failure.
    pub skipped: Vec<ParamPath>,
    /// Wall-clock duration per attempted parameter, milliseconds.
    pub durations_ms: BTreeMap<ParamPath, f64>,
    /// Total wall-clock duration, milliseconds.
    pub total_duration_ms: f64,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Cascade failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// When true, the first failure skips every remaining parameter.
    pub abort_on_failure: bool,
}

// ============================================================================
// SECTION: Cascade Executor
// ============================================================================

/// Executor walking the stale set in dependency order.
#[derive(Debug, Clone)]
pub struct CascadeExecutor {
    /// The immutable dependency graph consulted for ordering.
    graph: Arc<DependencyGraph>,
    /// Failure policy.
    config: CascadeConfig,
}

impl CascadeExecutor {
    /// Creates an executor over a built graph.
    #[must_use]
    pub const fn new(graph: Arc<DependencyGraph>, config: CascadeConfig) -> Self {
        Self {
            graph,
            config,
        }
    }

    /// Plans the recalculation order for the current stale set.
    ///
    /// A subset restricts the plan to those stale parameters; parameters in
    /// the subset that are not stale are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotBuilt`] when the graph has not been built.
    pub fn plan(
        &self,
        engine: &InvalidationEngine,
        subset: Option<&BTreeSet<ParamPath>>,
    ) -> Result<RecalculationOrder, GraphError> {
        let stale = engine.stale_parameters();
        let targets: BTreeSet<ParamPath> = subset.map_or_else(
            || stale.clone(),
            |requested| requested.intersection(stale).cloned().collect(),
        );
        let parameters = self.graph.computation_order(&targets)?;
        Ok(RecalculationOrder {
            parameters,
        })
    }

    /// Recomputes the planned parameters in order.
    ///
    /// Successful parameters are marked valid on the invalidation engine.
    /// On failure the executor continues or aborts per configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotBuilt`] when the graph has not been built.
    pub fn execute<R>(
        &self,
        engine: &mut InvalidationEngine,
        state: &mut DesignState,
        recompute: &mut R,
        subset: Option<&BTreeSet<ParamPath>>,
    ) -> Result<CascadeResult, GraphError>
    where
        R: ParameterRecompute,
    {
        let order = self.plan(engine, subset)?;
        let run_started = Instant::now();

        let mut result = CascadeResult {
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            durations_ms: BTreeMap::new(),
            total_duration_ms: 0.0,
        };
        let mut aborted = false;

        for path in order.parameters {
            if aborted {
                result.skipped.push(path);
                continue;
            }

            let started = Instant::now();
            let outcome = recompute.recompute(&path, state);
            result
                .durations_ms
                .insert(path.clone(), started.elapsed().as_secs_f64() * 1_000.0);

            match outcome {
                Ok(()) => {
                    engine.mark_valid(&path);
                    result.succeeded.push(path);
                }
                Err(err) => {
                    result.failed.push((path, err.to_string()));
                    if self.config.abort_on_failure {
                        aborted = true;
                    }
                }
            }
        }

        result.total_duration_ms = run_started.elapsed().as_secs_f64() * 1_000.0;
        Ok(result)
    }
}
