//! Cycle detection over the Base/Component backbone.
//!
//! Resource, patch and generator edges may legally point back into an
//! ancestor, so cycles are only searched along structural edges. The walk is a
//! colour-marking depth-first search with an explicit stack: roots first, then
//! any node not reached from a root in discovery order, outgoing edges in
//! declaration order. The first back edge found closes the reported cycle.

use super::Graph;
use crate::core::NodeIdentity;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is on the current DFS path.
    Gray,
    /// Node and everything below it has been visited.
    Black,
}

/// Returns the first Base/Component cycle, if any.
///
/// The path is in traversal order and repeats its first node at the end: a
/// self-reference on `A` is `[A, A]`, a two-node loop is `[A, B, A]`.
#[must_use]
pub fn find_structural_cycle(graph: &Graph) -> Option<Vec<NodeIdentity>> {
    let mut colors: HashMap<NodeIndex, Color> = HashMap::with_capacity(graph.node_count());

    let starts = graph
        .roots()
        .iter()
        .filter_map(|root| graph.node_index(root))
        .chain((0..graph.node_count()).map(NodeIndex::new));

    for start in starts {
        if colors.get(&start).copied().unwrap_or(Color::White) == Color::White
            && let Some(cycle) = visit(graph, start, &mut colors)
        {
            return Some(cycle);
        }
    }
    None
}

fn visit(
    graph: &Graph,
    start: NodeIndex,
    colors: &mut HashMap<NodeIndex, Color>,
) -> Option<Vec<NodeIdentity>> {
    // each frame is a node plus the structural successors still to explore
    let mut stack: Vec<(NodeIndex, std::vec::IntoIter<NodeIndex>)> = Vec::new();
    colors.insert(start, Color::Gray);
    stack.push((start, structural_successors(graph, start)));

    while let Some((node, successors)) = stack.last_mut() {
        let node = *node;
        match successors.next() {
            Some(next) => match colors.get(&next).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    let begin = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                    let mut cycle: Vec<NodeIdentity> = stack[begin..]
                        .iter()
                        .map(|(n, _)| graph.node_at(*n).identity.clone())
                        .collect();
                    cycle.push(graph.node_at(next).identity.clone());
                    return Some(cycle);
                }
                Color::White => {
                    colors.insert(next, Color::Gray);
                    stack.push((next, structural_successors(graph, next)));
                }
                Color::Black => {}
            },
            None => {
                colors.insert(node, Color::Black);
                stack.pop();
            }
        }
    }
    None
}

fn structural_successors(graph: &Graph, node: NodeIndex) -> std::vec::IntoIter<NodeIndex> {
    graph
        .outgoing_at(node)
        .filter(|(edge, _)| edge.edge_type.is_structural())
        .map(|(_, target)| target)
        .collect::<Vec<_>>()
        .into_iter()
}
