//! The immutable dependency graph.
//!
//! A [`Graph`] owns every [`Node`] and [`Edge`] discovered by a build. It is
//! stored as a `petgraph` directed graph plus an identity index, so node lookup
//! is O(1) and traversing a node's edges is linear in their number.
//!
//! Once built, a graph never changes. Per-node edge lists are fixed at
//! construction:
//!
//! - outgoing edges are kept in declaration order;
//! - incoming edges are grouped by source identity (sorted), then by the
//!   declaration order inside each source.
//!
//! Transformations such as [`Graph::filter_edges`] return a new graph. The
//! type is `Send + Sync` and can be queried from any number of threads without
//! locking.

pub mod cycles;
pub mod types;

pub use cycles::find_structural_cycle;
pub use types::{DeclaredReference, Edge, Node, ResourceSummary};

use crate::core::{EdgeType, KustgraphError, NodeIdentity};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use strsim::levenshtein;

/// Maximum edit distance, as a percentage of the query length, for a known
/// identity to be offered as a suggestion.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Directed graph of overlays and files.
#[derive(Debug, Clone)]
pub struct Graph {
    graph: DiGraph<Node, Edge>,
    index: HashMap<NodeIdentity, NodeIndex>,
    outgoing: Vec<Vec<EdgeIndex>>,
    incoming: Vec<Vec<EdgeIndex>>,
    roots: Vec<NodeIdentity>,
}

impl Graph {
    /// Assembles a graph from nodes in discovery order and edges.
    ///
    /// Every edge endpoint must be among `nodes`; edges referring to an unknown
    /// node are rejected.
    pub fn from_parts(
        roots: Vec<NodeIdentity>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self, KustgraphError> {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if index.contains_key(&node.identity) {
                return Err(KustgraphError::Other {
                    message: format!("duplicate node {}", node.identity),
                });
            }
            let identity = node.identity.clone();
            let idx = graph.add_node(node);
            index.insert(identity, idx);
        }

        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target))
            else {
                return Err(KustgraphError::Other {
                    message: format!("edge {} → {} has a missing endpoint", edge.source, edge.target),
                });
            };
            graph.add_edge(from, to, edge);
        }

        for root in &roots {
            if !index.contains_key(root) {
                return Err(KustgraphError::Other {
                    message: format!("root {root} is not part of the graph"),
                });
            }
        }

        let (outgoing, incoming) = edge_lists(&graph);
        Ok(Self {
            graph,
            index,
            outgoing,
            incoming,
            roots,
        })
    }

    pub fn get_node(&self, identity: &NodeIdentity) -> Option<&Node> {
        self.index.get(identity).map(|&idx| &self.graph[idx])
    }

    /// Like [`get_node`](Self::get_node) but signals an unknown identity with
    /// suggestions of similar ones.
    pub fn node(&self, identity: &NodeIdentity) -> Result<&Node, KustgraphError> {
        self.get_node(identity).ok_or_else(|| self.unknown_node(&identity.to_string()))
    }

    pub fn contains(&self, identity: &NodeIdentity) -> bool {
        self.index.contains_key(identity)
    }

    /// Outgoing edges in declaration order; empty for unknown identities.
    pub fn outgoing_edges(&self, identity: &NodeIdentity) -> Vec<&Edge> {
        self.edge_list(&self.outgoing, identity)
    }

    /// Incoming edges grouped by source identity, then declaration order.
    pub fn incoming_edges(&self, identity: &NodeIdentity) -> Vec<&Edge> {
        self.edge_list(&self.incoming, identity)
    }

    fn edge_list<'a>(&'a self, lists: &'a [Vec<EdgeIndex>], identity: &NodeIdentity) -> Vec<&'a Edge> {
        self.index
            .get(identity)
            .map(|idx| lists[idx.index()].iter().map(|&e| &self.graph[e]).collect())
            .unwrap_or_default()
    }

    /// Nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// All edges, grouped by source in discovery order, each group in
    /// declaration order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.outgoing.iter().flatten().map(|&e| &self.graph[e])
    }

    /// The identities the graph was built from.
    pub fn roots(&self) -> &[NodeIdentity] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns a new graph with the same nodes and only edges of `types`.
    #[must_use]
    pub fn filter_edges(&self, types: &[EdgeType]) -> Self {
        let keep: HashSet<EdgeType> = types.iter().copied().collect();
        // node indices are preserved because nodes are re-added in order
        let graph = self.graph.filter_map(
            |_, node| Some(node.clone()),
            |_, edge| keep.contains(&edge.edge_type).then(|| edge.clone()),
        );
        let (outgoing, incoming) = edge_lists(&graph);

        Self {
            graph,
            index: self.index.clone(),
            outgoing,
            incoming,
            roots: self.roots.clone(),
        }
    }

    /// Builds an [`KustgraphError::UnknownNode`] for `query`, with up to three
    /// similar identities as suggestions.
    pub fn unknown_node(&self, query: &str) -> KustgraphError {
        let mut scored: Vec<(String, usize)> = self
            .index
            .keys()
            .map(|id| {
                let candidate = id.to_string();
                let distance = levenshtein(query, &candidate);
                (candidate, distance)
            })
            .collect();
        scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let suggestions = scored
            .into_iter()
            .filter(|(_, dist)| *dist <= query.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(candidate, _)| candidate)
            .collect();

        KustgraphError::UnknownNode {
            identity: query.to_string(),
            suggestions,
        }
    }

    pub(crate) fn node_index(&self, identity: &NodeIdentity) -> Option<NodeIndex> {
        self.index.get(identity).copied()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub(crate) fn outgoing_at(&self, idx: NodeIndex) -> impl Iterator<Item = (&Edge, NodeIndex)> {
        self.outgoing[idx.index()].iter().map(move |&e| {
            let target = self.graph.edge_endpoints(e).map_or(idx, |(_, to)| to);
            (&self.graph[e], target)
        })
    }

    pub(crate) fn incoming_at(&self, idx: NodeIndex) -> impl Iterator<Item = (&Edge, NodeIndex)> {
        self.incoming[idx.index()].iter().map(move |&e| {
            let source = self.graph.edge_endpoints(e).map_or(idx, |(from, _)| from);
            (&self.graph[e], source)
        })
    }
}

/// Per-node outgoing lists in declaration order and incoming lists grouped
/// by source identity, then declaration order.
fn edge_lists(graph: &DiGraph<Node, Edge>) -> (Vec<Vec<EdgeIndex>>, Vec<Vec<EdgeIndex>>) {
    let mut outgoing = vec![Vec::new(); graph.node_count()];
    let mut incoming = vec![Vec::new(); graph.node_count()];

    for edge in graph.edge_references() {
        outgoing[edge.source().index()].push(edge.id());
        incoming[edge.target().index()].push(edge.id());
    }

    for list in &mut outgoing {
        list.sort_by_key(|&e| graph[e].order);
    }
    for list in &mut incoming {
        list.sort_by(|&a, &b| {
            let (a, b) = (&graph[a], &graph[b]);
            a.source.cmp(&b.source).then(a.order.cmp(&b.order))
        });
    }

    (outgoing, incoming)
}
