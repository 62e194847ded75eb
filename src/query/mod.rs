//! Read-only queries over a built [`Graph`].
//!
//! A [`QueryEngine`] borrows the graph and never changes it, so any number of
//! engines can query the same graph from different threads. Every query that
//! takes an identity fails with [`KustgraphError::UnknownNode`] when the
//! identity is not part of the graph.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kustgraph_cli::core::{NodeIdentity, ReferenceType};
//! use kustgraph_cli::graph::Graph;
//! use kustgraph_cli::query::QueryEngine;
//!
//! # fn example(graph: &Graph) -> anyhow::Result<()> {
//! let engine = QueryEngine::new(graph);
//! let file = NodeIdentity::local("/repo/base/deployment.yaml");
//!
//! let users = engine.ancestors(&file, &[ReferenceType::Resource])?;
//! println!("declared directly by: {:?}", users.direct);
//! println!("affected apps: {:?}", engine.affected_roots(&file)?);
//! # Ok(())
//! # }
//! ```

use crate::core::{EdgeType, KustgraphError, NodeIdentity, ReferenceType};
use crate::graph::{Edge, Graph, Node};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};

/// Nodes reached by a traversal, split by distance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Related {
    /// Nodes one edge away, in edge order.
    pub direct: Vec<NodeIdentity>,
    /// Nodes two or more edges away, in breadth-first order.
    pub transitive: Vec<NodeIdentity>,
}

impl Related {
    /// All related nodes, direct ones first.
    pub fn all(&self) -> impl Iterator<Item = &NodeIdentity> {
        self.direct.iter().chain(&self.transitive)
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.transitive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.transitive.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Incoming,
    Outgoing,
}

/// Query front end for a [`Graph`].
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'g> {
    graph: &'g Graph,
}

impl<'g> QueryEngine<'g> {
    pub const fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    pub const fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Nodes that reach `identity` through edges of `edge_types`.
    ///
    /// A node reached at several distances is reported once, at the shortest.
    /// The queried node itself is never part of the result.
    pub fn ancestors(
        &self,
        identity: &NodeIdentity,
        edge_types: &[EdgeType],
    ) -> Result<Related, KustgraphError> {
        let start = self.index_of(identity)?;
        Ok(self.related(start, edge_types, Direction::Incoming))
    }

    /// Nodes reachable from `identity` through edges of `edge_types`.
    pub fn descendants(
        &self,
        identity: &NodeIdentity,
        edge_types: &[EdgeType],
    ) -> Result<Related, KustgraphError> {
        let start = self.index_of(identity)?;
        Ok(self.related(start, edge_types, Direction::Outgoing))
    }

    /// Every simple path from `from` to `to` over edges of any type.
    ///
    /// Paths are listed in depth-first, declaration order. A node and itself
    /// are joined by the single path `[from]`.
    pub fn paths_between(
        &self,
        from: &NodeIdentity,
        to: &NodeIdentity,
    ) -> Result<Vec<Vec<NodeIdentity>>, KustgraphError> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;
        if start == goal {
            return Ok(vec![vec![from.clone()]]);
        }

        let mut paths = Vec::new();
        let mut path = vec![start];
        let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
        let mut stack = vec![self.distinct_successors(start).into_iter()];

        while let Some(successors) = stack.last_mut() {
            match successors.next() {
                Some(next) if next == goal => {
                    paths.push(
                        path.iter()
                            .chain(std::iter::once(&goal))
                            .map(|&idx| self.identity_at(idx))
                            .collect(),
                    );
                }
                Some(next) if !on_path.contains(&next) => {
                    on_path.insert(next);
                    path.push(next);
                    stack.push(self.distinct_successors(next).into_iter());
                }
                Some(_) => {}
                None => {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        on_path.remove(&done);
                    }
                }
            }
        }
        Ok(paths)
    }

    /// The order in which the Base/Component closure of `identity` is
    /// layered, ending with `identity` itself.
    ///
    /// Nodes farther away (by longest Base/Component path) come first; nodes
    /// at the same distance keep their depth-first declaration order. Every
    /// base or component therefore precedes all overlays built on it.
    pub fn application_order(&self, identity: &NodeIdentity) -> Result<Vec<NodeIdentity>, KustgraphError> {
        let start = self.index_of(identity)?;

        // preorder positions and postorder of the structural closure
        let mut preorder: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut postorder = Vec::new();
        let mut stack = vec![(start, self.structural_successors(start).into_iter())];
        while let Some((node, successors)) = stack.last_mut() {
            let node = *node;
            match successors.next() {
                Some(next) if !preorder.contains_key(&next) => {
                    preorder.insert(next, preorder.len());
                    stack.push((next, self.structural_successors(next).into_iter()));
                }
                Some(_) => {}
                None => {
                    postorder.push(node);
                    stack.pop();
                }
            }
        }

        // longest distance from the start, relaxed in topological order
        let mut depth: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        for &node in postorder.iter().rev() {
            let here = depth.get(&node).copied().unwrap_or(0);
            for next in self.structural_successors(node) {
                let entry = depth.entry(next).or_insert(0);
                *entry = (*entry).max(here + 1);
            }
        }

        let mut order = postorder;
        order.sort_by_key(|idx| {
            (
                Reverse(depth.get(idx).copied().unwrap_or(0)),
                preorder.get(idx).copied().unwrap_or(usize::MAX),
            )
        });
        Ok(order.into_iter().map(|idx| self.identity_at(idx)).collect())
    }

    /// Every node that references `identity`, directly or not, over any edge
    /// type. Sorted.
    pub fn impact(&self, identity: &NodeIdentity) -> Result<Vec<NodeIdentity>, KustgraphError> {
        let related = self.ancestors(identity, &ReferenceType::ALL)?;
        let mut impact: Vec<NodeIdentity> = related.all().cloned().collect();
        impact.sort();
        Ok(impact)
    }

    /// Overlays no other node references, sorted.
    ///
    /// An overlay referencing only itself still counts as a root.
    pub fn root_overlays(&self) -> Vec<NodeIdentity> {
        let mut roots: Vec<NodeIdentity> = self
            .graph
            .nodes()
            .filter(|node| node.is_overlay())
            .filter(|node| {
                self.graph
                    .incoming_edges(&node.identity)
                    .iter()
                    .all(|edge| edge.source == node.identity)
            })
            .map(|node| node.identity.clone())
            .collect();
        roots.sort();
        roots
    }

    /// Root overlays whose closure contains `identity`, sorted. A root overlay
    /// is affected by itself.
    pub fn affected_roots(&self, identity: &NodeIdentity) -> Result<Vec<NodeIdentity>, KustgraphError> {
        let related = self.ancestors(identity, &ReferenceType::ALL)?;
        let users: HashSet<&NodeIdentity> = related.all().chain(std::iter::once(identity)).collect();
        Ok(self
            .root_overlays()
            .into_iter()
            .filter(|root| users.contains(root))
            .collect())
    }

    /// Every file an overlay is assembled from: its own kustomization file,
    /// those of all overlays it reaches, and every leaf file it reaches.
    /// Sorted and without duplicates.
    ///
    /// Remote overlays that were not retrieved contribute no file.
    pub fn overlay_files(&self, identity: &NodeIdentity) -> Result<Vec<NodeIdentity>, KustgraphError> {
        let node = self.graph.node(identity)?;
        if !node.is_overlay() {
            return Err(KustgraphError::NotAnOverlay {
                identity: identity.clone(),
            });
        }

        let closure = self.descendants(identity, &ReferenceType::ALL)?;
        let mut files: Vec<NodeIdentity> = std::iter::once(node)
            .chain(closure.all().filter_map(|id| self.graph.get_node(id)))
            .filter_map(backing_file)
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn index_of(&self, identity: &NodeIdentity) -> Result<NodeIndex, KustgraphError> {
        self.graph
            .node_index(identity)
            .ok_or_else(|| self.graph.unknown_node(&identity.to_string()))
    }

    fn identity_at(&self, idx: NodeIndex) -> NodeIdentity {
        self.graph.node_at(idx).identity.clone()
    }

    fn related(&self, start: NodeIndex, edge_types: &[EdgeType], direction: Direction) -> Related {
        let keep = |edge: &Edge| edge_types.contains(&edge.edge_type);
        let mut seen: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::from([(start, 0)]);
        let mut related = Related::default();

        while let Some((node, distance)) = queue.pop_front() {
            let neighbours: Vec<NodeIndex> = match direction {
                Direction::Incoming => self.graph.incoming_at(node).filter(|(e, _)| keep(e)).map(|(_, n)| n).collect(),
                Direction::Outgoing => self.graph.outgoing_at(node).filter(|(e, _)| keep(e)).map(|(_, n)| n).collect(),
            };
            for next in neighbours {
                if !seen.insert(next) {
                    continue;
                }
                if distance == 0 {
                    related.direct.push(self.identity_at(next));
                } else {
                    related.transitive.push(self.identity_at(next));
                }
                queue.push_back((next, distance + 1));
            }
        }
        related
    }

    /// Outgoing targets in declaration order, each listed once.
    fn distinct_successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .outgoing_at(node)
            .map(|(_, target)| target)
            .filter(|target| seen.insert(*target))
            .collect()
    }

    fn structural_successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .outgoing_at(node)
            .filter(|(edge, _)| edge.edge_type.is_structural())
            .map(|(_, target)| target)
            .filter(|target| *target != node && seen.insert(*target))
            .collect()
    }
}

fn backing_file(node: &Node) -> Option<NodeIdentity> {
    if node.is_overlay() {
        node.manifest.clone()
    } else {
        Some(node.identity.clone())
    }
}
