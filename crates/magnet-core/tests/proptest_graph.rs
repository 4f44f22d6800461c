// crates/magnet-core/tests/proptest_graph.rs
// ============================================================================
// Module: Dependency Graph Property Tests
// Description: Property tests for symmetry, ordering, and stability.
// Purpose: Detect invariant violations across generated DAGs.
// ============================================================================

//! Property-based tests for dependency graph invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use magnet_core::DependencyGraph;
use magnet_core::EdgeType;
use magnet_core::ParamPath;
use magnet_core::Timestamp;
use proptest::prelude::*;

/// Node name for a generated index.
fn name(index: usize) -> ParamPath {
    ParamPath::new(format!("gen.p{index:02}"))
}

/// Builds a graph from generated forward edges (acyclic by construction).
fn build_graph(edges: &[(usize, usize)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (source, target) in edges {
        graph.add_dependency(&name(*target), &name(*source), EdgeType::DataFlow, 1.0);
    }
    graph.build(Timestamp::Logical(0)).unwrap();
    graph
}

/// Strategy: forward edges over up to 12 nodes, source index below target.
fn forward_edges() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0_usize..11, 1_usize..12), 1..40).prop_map(|pairs| {
        pairs
            .into_iter()
            .filter(|(source, target)| source < target)
            .collect()
    })
}

proptest! {
    /// Dependents and dependencies stay mirror images for every pair.
    #[test]
    fn direct_sets_stay_symmetric(edges in forward_edges()) {
        let graph = build_graph(&edges);
        for path in graph.all_parameters() {
            for dependent in graph.direct_dependents(&path) {
                prop_assert!(graph.direct_dependencies(&dependent).contains(&path));
            }
            for dependency in graph.direct_dependencies(&path) {
                prop_assert!(graph.direct_dependents(&dependency).contains(&path));
            }
        }
    }

    /// The downstream closure equals the transitive closure of dependents.
    #[test]
    fn downstream_closure_is_transitive(edges in forward_edges()) {
        let graph = build_graph(&edges);
        for path in graph.all_parameters() {
            let closure = graph.all_downstream(&path);
            for step in graph.direct_dependents(&path) {
                prop_assert!(closure.contains(&step));
                for next in graph.all_downstream(&step) {
                    prop_assert!(closure.contains(&next));
                }
            }
        }
    }

    /// Orderings are permutations of the subset consistent with dependencies.
    #[test]
    fn computation_order_is_consistent(edges in forward_edges()) {
        let graph = build_graph(&edges);
        let subset: BTreeSet<ParamPath> = graph.all_parameters().into_iter().collect();
        let order = graph.computation_order(&subset).unwrap();

        prop_assert_eq!(order.len(), subset.len());
        let position = |path: &ParamPath| {
            order.iter().position(|candidate| candidate == path).unwrap()
        };
        for path in &subset {
            for dependent in graph.direct_dependents(path) {
                prop_assert!(position(path) < position(&dependent));
            }
        }
    }

    /// Repeated orderings of the same built graph are byte-identical.
    #[test]
    fn computation_order_is_stable(edges in forward_edges()) {
        let graph = build_graph(&edges);
        let subset: BTreeSet<ParamPath> = graph.all_parameters().into_iter().collect();
        let first = graph.computation_order(&subset).unwrap();
        let second = graph.computation_order(&subset).unwrap();
        prop_assert_eq!(first, second);
    }
}
