//! Interface to the external maximum-clique search.
//!
//! The consensus loop only uses the oracle to validate a candidate inlier
//! set: it asks for a clique of at least a given size in the sample-adjacency
//! subgraph of the candidates and relies on nothing but the size of the
//! answer. The search itself (exact or heuristic, time-bounded or not) is
//! the implementor's concern.

use petgraph::graph::{NodeIndex, UnGraph};

use crate::adjacency::AdjacencyMatrix;

/// Graph handed to the oracle. Node weights are correspondence indices.
pub type CliqueGraph = UnGraph<usize, ()>;

/// Maximum-clique capability consumed by the inlier validation step.
///
/// # Example: oracle from a closure
///
/// ```rust
/// use adjacency_ransac::clique::{CliqueGraph, CliqueOracle};
/// use petgraph::graph::NodeIndex;
///
/// let reject_all = |_: &CliqueGraph, _: usize| -> Option<Vec<NodeIndex>> { None };
/// let graph = CliqueGraph::default();
/// assert!(reject_all.find_clique(&graph, 8).is_none());
/// ```
pub trait CliqueOracle {
    /// Return a clique of at least `min_size` vertices, or `None` if there is none.
    fn find_clique(&self, graph: &CliqueGraph, min_size: usize) -> Option<Vec<NodeIndex>>;
}

impl<F> CliqueOracle for F
where
    F: Fn(&CliqueGraph, usize) -> Option<Vec<NodeIndex>>,
{
    fn find_clique(&self, graph: &CliqueGraph, min_size: usize) -> Option<Vec<NodeIndex>> {
        self(graph, min_size)
    }
}

/// Oracle that trusts the candidate set: it answers with every vertex as long
/// as there are at least `min_size` of them.
///
/// Using it turns the structural validation into a plain size check.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustCandidates;

impl CliqueOracle for TrustCandidates {
    fn find_clique(&self, graph: &CliqueGraph, min_size: usize) -> Option<Vec<NodeIndex>> {
        (graph.node_count() >= min_size).then(|| graph.node_indices().collect())
    }
}

/// Subgraph of `adjacency` induced by `vertices`.
pub fn induced_subgraph(adjacency: &AdjacencyMatrix, vertices: &[usize]) -> CliqueGraph {
    let mut graph = CliqueGraph::with_capacity(vertices.len(), vertices.len());
    let nodes: Vec<NodeIndex> = vertices.iter().map(|&v| graph.add_node(v)).collect();
    for j in 0..vertices.len() {
        for i in (j + 1)..vertices.len() {
            if adjacency.test(vertices[j], vertices[i]) {
                graph.add_edge(nodes[j], nodes[i], ());
            }
        }
    }
    graph
}

/// Whether `vertices` are pairwise connected in `graph`.
pub fn is_clique(graph: &CliqueGraph, vertices: &[NodeIndex]) -> bool {
    vertices.iter().enumerate().all(|(k, &a)| {
        vertices[k + 1..]
            .iter()
            .all(|&b| a != b && graph.contains_edge(a, b))
    })
}
