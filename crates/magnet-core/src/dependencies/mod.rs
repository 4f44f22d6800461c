// crates/magnet-core/src/dependencies/mod.rs
// ============================================================================
// Module: MAGNET Dependency Engine
// Description: Dependency graph, invalidation, revalidation, and cascades.
// Purpose: Provide cascade invalidation and ordered recomputation.
// Dependencies: crate::core, crate::interfaces, crate::state
// ============================================================================

//! ## Overview
//! The dependency engine turns parameter changes into work: the graph knows
//! what depends on what, the invalidation engine tracks staleness, the
//! revalidation scheduler queues validators, and the cascade executor drives
//! recomputation in dependency order.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cascade;
pub mod graph;
pub mod invalidation;
pub mod revalidation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cascade::CascadeConfig;
pub use cascade::CascadeExecutor;
pub use cascade::CascadeResult;
pub use cascade::RecalculationOrder;
pub use graph::DependencyEdge;
pub use graph::DependencyGraph;
pub use graph::DependencyNode;
pub use graph::EdgeDoc;
pub use graph::EdgeType;
pub use graph::GraphDoc;
pub use graph::GraphError;
pub use graph::NodeDoc;
pub use graph::standard_graph;
pub use invalidation::DEFAULT_EVENT_CAPACITY;
pub use invalidation::InvalidateOptions;
pub use invalidation::InvalidationEngine;
pub use invalidation::InvalidationEvent;
pub use invalidation::InvalidationReason;
pub use invalidation::InvalidationScope;
pub use revalidation::RevalidationScheduler;
pub use revalidation::RevalidationTask;
