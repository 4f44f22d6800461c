// crates/magnet-core/src/dependencies/graph.rs
// ============================================================================
// Module: MAGNET Dependency Graph
// Description: Typed DAG of parameter dependencies with deterministic ordering.
// Purpose: Drive cascade invalidation and topological recomputation.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The dependency graph is a static, validated DAG over parameter paths.
//! Nodes live in an arena addressed by integer handles; edges are typed
//! (data-flow, semantic, validation, derived). Cycle detection and the cached
//! topological order consider only data-flow and derived edges; invalidation
//! cascades follow every edge type so staleness stays conservative. The
//! topological tie-break is ascending parameter path, which makes repeated
//! orderings byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::BinaryHeap;
use std::collections::VecDeque;
use std::sync::OnceLock;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ErrorEnvelope;
use crate::core::ErrorKind;
use crate::core::ParamPath;
use crate::core::Phase;
use crate::core::Timestamp;
use crate::core::ToEnvelope;
use crate::core::parameter_dependencies;
use crate::core::phase_for_parameter;

// ============================================================================
// SECTION: Edge Types
// ============================================================================

/// Relationship kind carried by a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// The target is computed from the source value.
    DataFlow,
    /// The target is semantically affected without a direct computation.
    Semantic,
    /// The target's validation depends on the source.
    Validation,
    /// The target is a derived convenience quantity.
    Derived,
}

impl EdgeType {
    /// Returns true when the edge constrains recomputation ordering.
    #[must_use]
    pub const fn orders_recomputation(self) -> bool {
        matches!(self, Self::DataFlow | Self::Derived)
    }
}

// ============================================================================
// SECTION: Nodes and Edges
// ============================================================================

/// One parameter node in the dependency arena.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// The parameter path; node identity.
    pub parameter_path: ParamPath,
    /// Owning phase, when resolvable.
    pub phase: Option<Phase>,
    /// Handles of nodes this node depends on.
    upstream: BTreeSet<usize>,
    /// Handles of nodes depending on this node.
    downstream: BTreeSet<usize>,
}

/// One typed, weighted edge between arena handles.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEdge {
    /// Handle of the upstream node.
    pub source: usize,
    /// Handle of the downstream node.
    pub target: usize,
    /// Relationship kind.
    pub edge_type: EdgeType,
    /// Relative edge weight.
    pub weight: f64,
}

// ============================================================================
// SECTION: Serialized Form
// ============================================================================

/// Serialized node payload keyed by parameter path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDoc {
    /// Owning phase, when resolvable.
    pub phase: Option<Phase>,
    /// Paths this node depends on.
    pub depends_on: Vec<ParamPath>,
    /// Paths depending on this node.
    pub depended_by: Vec<ParamPath>,
}

/// Serialized edge payload with resolved paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDoc {
    /// Upstream parameter path.
    pub source: ParamPath,
    /// Downstream parameter path.
    pub target: ParamPath,
    /// Relationship kind.
    pub edge_type: EdgeType,
    /// Relative edge weight.
    pub weight: f64,
}

/// Round-trippable serialized graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDoc {
    /// Nodes keyed by parameter path.
    pub nodes: BTreeMap<ParamPath, NodeDoc>,
    /// All edges with resolved paths.
    pub edges: Vec<EdgeDoc>,
    /// Build timestamp, present when the source graph was built.
    pub build_timestamp: Option<Timestamp>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by dependency graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A data-flow or derived cycle was found at build time.
    #[error("circular dependency detected: {}", format_cycle(cycle))]
    CyclicDependency {
        /// The concrete cycle, listed in traversal order.
        cycle: Vec<ParamPath>,
    },
    /// An ordering query ran before the graph was built.
    #[error("dependency graph is not built; call build() first")]
    NotBuilt,
}

impl ToEnvelope for GraphError {
    fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            Self::CyclicDependency { .. } => ErrorEnvelope::new(
                ErrorKind::State,
                "circular_dependency",
                self.to_string(),
                "Break the cycle by removing or retyping one of the listed edges.",
            ),
            Self::NotBuilt => ErrorEnvelope::new(
                ErrorKind::State,
                "graph_not_built",
                self.to_string(),
                "Build the dependency graph before requesting orderings.",
            ),
        }
    }
}

/// Renders a cycle path for error messages.
fn format_cycle(cycle: &[ParamPath]) -> String {
    cycle.iter().map(ParamPath::as_str).collect::<Vec<_>>().join(" -> ")
}

// ============================================================================
// SECTION: Dependency Graph
// ============================================================================

/// Static, validated DAG of parameter dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node arena; handles are indices into this vector.
    nodes: Vec<DependencyNode>,
    /// Path to handle index.
    index: BTreeMap<ParamPath, usize>,
    /// All edges in insertion order.
    edges: Vec<DependencyEdge>,
    /// Idempotency keys over (source, target, edge type).
    edge_keys: BTreeSet<(usize, usize, EdgeType)>,
    /// Set once `build` succeeds; cleared by mutation.
    built: bool,
    /// Timestamp of the successful build.
    build_timestamp: Option<Timestamp>,
    /// Cached topological order over all handles.
    topo: Vec<usize>,
    /// Rank of each handle within `topo`.
    topo_rank: Vec<usize>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the canonical graph from the static definition tables.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicDependency`] when the tables contain a
    /// data-flow cycle.
    pub fn from_definitions() -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for (target, sources) in parameter_dependencies() {
            for source in sources {
                graph.add_dependency(&target, &source, EdgeType::DataFlow, 1.0);
            }
        }
        graph.build(Timestamp::Logical(0))?;
        Ok(graph)
    }

    /// Returns true when `build` has succeeded since the last mutation.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// Returns the build timestamp, when built.
    #[must_use]
    pub const fn build_timestamp(&self) -> Option<Timestamp> {
        self.build_timestamp
    }

    /// Adds a parameter node, inferring the phase when not supplied.
    ///
    /// Adding an existing path returns the existing handle unchanged.
    pub fn add_parameter(&mut self, path: &ParamPath, phase: Option<Phase>) -> usize {
        if let Some(handle) = self.index.get(path) {
            return *handle;
        }
        self.built = false;
        let handle = self.nodes.len();
        self.nodes.push(DependencyNode {
            parameter_path: path.clone(),
            phase: phase.or_else(|| phase_for_parameter(path)),
            upstream: BTreeSet::new(),
            downstream: BTreeSet::new(),
        });
        self.index.insert(path.clone(), handle);
        handle
    }

    /// Adds a typed dependency edge `target depends on source`.
    ///
    /// Absent nodes are created. Returns false when the (source, target, type)
    /// triple already exists. The node upstream/downstream sets are mutated
    /// together so they stay mirror images.
    pub fn add_dependency(
        &mut self,
        target: &ParamPath,
        source: &ParamPath,
        edge_type: EdgeType,
        weight: f64,
    ) -> bool {
        let source_handle = self.add_parameter(source, None);
        let target_handle = self.add_parameter(target, None);
        if !self.edge_keys.insert((source_handle, target_handle, edge_type)) {
            return false;
        }
        self.built = false;
        self.edges.push(DependencyEdge {
            source: source_handle,
            target: target_handle,
            edge_type,
            weight,
        });
        self.nodes[target_handle].upstream.insert(source_handle);
        self.nodes[source_handle].downstream.insert(target_handle);
        true
    }

    /// Validates acyclicity and caches the deterministic topological order.
    ///
    /// Cycle detection and ordering consider only data-flow and derived
    /// edges. Ready nodes are consumed in ascending parameter-path order so
    /// repeated builds of the same graph produce identical orderings.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicDependency`] carrying the concrete cycle.
    pub fn build(&mut self, built_at: Timestamp) -> Result<(), GraphError> {
        if let Some(cycle) = self.find_ordering_cycle() {
            return Err(GraphError::CyclicDependency {
                cycle,
            });
        }

        let ordering_edges = self.ordering_adjacency();
        let mut indegree = vec![0_usize; self.nodes.len()];
        for targets in &ordering_edges {
            for target in targets {
                indegree[*target] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<(ParamPath, usize)>> = BinaryHeap::new();
        for (handle, degree) in indegree.iter().enumerate() {
            if *degree == 0 {
                ready.push(Reverse((self.nodes[handle].parameter_path.clone(), handle)));
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, handle))) = ready.pop() {
            order.push(handle);
            for target in &ordering_edges[handle] {
                indegree[*target] -= 1;
                if indegree[*target] == 0 {
                    ready.push(Reverse((self.nodes[*target].parameter_path.clone(), *target)));
                }
            }
        }

        let mut rank = vec![0_usize; self.nodes.len()];
        for (position, handle) in order.iter().enumerate() {
            rank[*handle] = position;
        }

        self.topo = order;
        self.topo_rank = rank;
        self.built = true;
        self.build_timestamp = Some(built_at);
        Ok(())
    }

    /// Returns true when the path has a node.
    #[must_use]
    pub fn has_parameter(&self, path: &ParamPath) -> bool {
        self.index.contains_key(path)
    }

    /// Returns every known parameter path in ascending order.
    #[must_use]
    pub fn all_parameters(&self) -> Vec<ParamPath> {
        self.index.keys().cloned().collect()
    }

    /// Returns the node for a path, if present.
    #[must_use]
    pub fn node(&self, path: &ParamPath) -> Option<&DependencyNode> {
        self.index.get(path).map(|handle| &self.nodes[*handle])
    }

    /// Returns the known parameters owned by a phase, ascending.
    #[must_use]
    pub fn parameters_for_phase(&self, phase: Phase) -> Vec<ParamPath> {
        self.index
            .iter()
            .filter(|(_, handle)| self.nodes[**handle].phase == Some(phase))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Returns the direct upstream paths of a parameter.
    #[must_use]
    pub fn direct_dependencies(&self, path: &ParamPath) -> BTreeSet<ParamPath> {
        self.index.get(path).map_or_else(BTreeSet::new, |handle| {
            self.nodes[*handle]
                .upstream
                .iter()
                .map(|upstream| self.nodes[*upstream].parameter_path.clone())
                .collect()
        })
    }

    /// Returns the direct downstream paths of a parameter.
    #[must_use]
    pub fn direct_dependents(&self, path: &ParamPath) -> BTreeSet<ParamPath> {
        self.index.get(path).map_or_else(BTreeSet::new, |handle| {
            self.nodes[*handle]
                .downstream
                .iter()
                .map(|downstream| self.nodes[*downstream].parameter_path.clone())
                .collect()
        })
    }

    /// Returns the transitive upstream closure of a parameter.
    #[must_use]
    pub fn all_dependencies(&self, path: &ParamPath) -> BTreeSet<ParamPath> {
        self.closure(path, |node| &node.upstream)
    }

    /// Returns the transitive downstream closure of a parameter.
    #[must_use]
    pub fn all_downstream(&self, path: &ParamPath) -> BTreeSet<ParamPath> {
        self.closure(path, |node| &node.downstream)
    }

    /// Returns the phases of every transitive downstream parameter.
    #[must_use]
    pub fn downstream_phases(&self, path: &ParamPath) -> BTreeSet<Phase> {
        self.all_downstream(path)
            .iter()
            .filter_map(|downstream| {
                self.node(downstream).and_then(|node| node.phase)
            })
            .collect()
    }

    /// Projects the cached topological order onto a subset of paths.
    ///
    /// Unknown paths are dropped from the projection.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotBuilt`] when the graph has not been built.
    pub fn computation_order(
        &self,
        subset: &BTreeSet<ParamPath>,
    ) -> Result<Vec<ParamPath>, GraphError> {
        if !self.built {
            return Err(GraphError::NotBuilt);
        }
        let mut handles: Vec<usize> = subset
            .iter()
            .filter_map(|path| self.index.get(path).copied())
            .collect();
        handles.sort_by_key(|handle| self.topo_rank[*handle]);
        Ok(handles
            .into_iter()
            .map(|handle| self.nodes[handle].parameter_path.clone())
            .collect())
    }

    /// Orders the changed parameters plus their downstream closures.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotBuilt`] when the graph has not been built.
    pub fn recalculation_order(
        &self,
        changed: &BTreeSet<ParamPath>,
    ) -> Result<Vec<ParamPath>, GraphError> {
        let mut affected: BTreeSet<ParamPath> = changed.clone();
        for path in changed {
            affected.extend(self.all_downstream(path));
        }
        self.computation_order(&affected)
    }

    /// Serializes the graph with resolved paths.
    #[must_use]
    pub fn to_dict(&self) -> GraphDoc {
        let nodes = self
            .index
            .iter()
            .map(|(path, handle)| {
                let node = &self.nodes[*handle];
                (
                    path.clone(),
                    NodeDoc {
                        phase: node.phase,
                        depends_on: node
                            .upstream
                            .iter()
                            .map(|upstream| self.nodes[*upstream].parameter_path.clone())
                            .collect(),
                        depended_by: node
                            .downstream
                            .iter()
                            .map(|downstream| self.nodes[*downstream].parameter_path.clone())
                            .collect(),
                    },
                )
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|edge| EdgeDoc {
                source: self.nodes[edge.source].parameter_path.clone(),
                target: self.nodes[edge.target].parameter_path.clone(),
                edge_type: edge.edge_type,
                weight: edge.weight,
            })
            .collect();
        GraphDoc {
            nodes,
            edges,
            build_timestamp: self.build_timestamp,
        }
    }

    /// Rebuilds a graph from its serialized form.
    ///
    /// A document carrying a build timestamp is rebuilt and revalidated.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicDependency`] when the document encodes a
    /// data-flow cycle.
    pub fn from_dict(doc: &GraphDoc) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for (path, node) in &doc.nodes {
            graph.add_parameter(path, node.phase);
        }
        for edge in &doc.edges {
            graph.add_dependency(&edge.target, &edge.source, edge.edge_type, edge.weight);
        }
        if let Some(built_at) = doc.build_timestamp {
            graph.build(built_at)?;
        }
        Ok(graph)
    }

    /// Generic BFS closure over one direction of the node sets.
    fn closure(
        &self,
        path: &ParamPath,
        direction: impl Fn(&DependencyNode) -> &BTreeSet<usize>,
    ) -> BTreeSet<ParamPath> {
        let Some(start) = self.index.get(path) else {
            return BTreeSet::new();
        };
        let mut seen: BTreeSet<usize> = BTreeSet::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        queue.push_back(*start);
        while let Some(handle) = queue.pop_front() {
            for next in direction(&self.nodes[handle]) {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen.into_iter().map(|handle| self.nodes[handle].parameter_path.clone()).collect()
    }

    /// Adjacency lists restricted to ordering edges (data-flow and derived).
    fn ordering_adjacency(&self) -> Vec<BTreeSet<usize>> {
        let mut adjacency = vec![BTreeSet::new(); self.nodes.len()];
        for edge in &self.edges {
            if edge.edge_type.orders_recomputation() {
                adjacency[edge.source].insert(edge.target);
            }
        }
        adjacency
    }

    /// Finds one cycle over ordering edges, if any, via DFS color marks.
    fn find_ordering_cycle(&self) -> Option<Vec<ParamPath>> {
        /// DFS visitation state per node.
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            /// Not yet visited.
            White,
            /// On the current DFS stack.
            Gray,
            /// Fully explored.
            Black,
        }

        let adjacency = self.ordering_adjacency();
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut stack: Vec<usize> = Vec::new();

        for start in 0..self.nodes.len() {
            if colors[start] != Color::White {
                continue;
            }
            // Iterative DFS: (node, child iterator position).
            let mut frames: Vec<(usize, Vec<usize>)> = Vec::new();
            colors[start] = Color::Gray;
            stack.push(start);
            frames.push((start, adjacency[start].iter().copied().collect()));

            loop {
                let Some(frame) = frames.last_mut() else {
                    break;
                };
                let node = frame.0;
                let child = frame.1.pop();
                match child {
                    Some(next) => match colors[next] {
                        Color::White => {
                            colors[next] = Color::Gray;
                            stack.push(next);
                            frames.push((next, adjacency[next].iter().copied().collect()));
                        }
                        Color::Gray => {
                            let entry = stack.iter().position(|handle| *handle == next);
                            let mut cycle: Vec<ParamPath> = stack[entry.unwrap_or(0)..]
                                .iter()
                                .map(|handle| self.nodes[*handle].parameter_path.clone())
                                .collect();
                            cycle.push(self.nodes[next].parameter_path.clone());
                            return Some(cycle);
                        }
                        Color::Black => {}
                    },
                    None => {
                        colors[node] = Color::Black;
                        stack.pop();
                        frames.pop();
                    }
                }
            }
        }
        None
    }
}

// ============================================================================
// SECTION: Process Default Graph
// ============================================================================

/// Lazily built canonical graph shared across the process.
static STANDARD_GRAPH: OnceLock<DependencyGraph> = OnceLock::new();

/// Returns the process-wide canonical graph, building it on first use.
///
/// The graph is built once from the static definition tables and treated as
/// immutable afterwards.
///
/// # Errors
///
/// Returns [`GraphError::CyclicDependency`] when the definition tables are
/// inconsistent; subsequent calls retry the build.
pub fn standard_graph() -> Result<&'static DependencyGraph, GraphError> {
    if let Some(graph) = STANDARD_GRAPH.get() {
        return Ok(graph);
    }
    let graph = DependencyGraph::from_definitions()?;
    Ok(STANDARD_GRAPH.get_or_init(|| graph))
}
