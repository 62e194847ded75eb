//! Recursive graph construction.
//!
//! [`GraphBuilder::build`] discovers every node reachable from a set of root
//! overlays and returns the finished, immutable [`Graph`]. The walk is a
//! depth-first search driven by an explicit stack; each identity moves through
//! three visitation states:
//!
//! ```text
//! Unvisited --(loaded, pushed)--> InProgress --(all references done)--> Complete
//! ```
//!
//! When a node is expanded its references are resolved up front and every
//! target nobody asked for yet is handed to a background task, so independent
//! branches load in parallel. The driver itself still awaits targets one by
//! one in declaration order; the loader's single-flight cells make the
//! background work invisible except for speed. Edge order, the error that
//! aborts a broken build and the kind of every node are therefore the same on
//! every run.
//!
//! Any resolution, retrieval or parse error aborts the build and carries the
//! chain of overlays from a root to the declaring node. A Base/Component
//! cycle aborts it as well, whether it is noticed during the walk or by the
//! final pass over the structural sub-relation.

pub mod cancel;

pub use cancel::CancellationToken;

use crate::constants::{DEFAULT_REVISION, default_max_parallel};
use crate::core::{KustgraphError, NodeIdentity, ReferenceType, TargetShape};
use crate::graph::{DeclaredReference, Edge, Graph, Node, find_structural_cycle};
use crate::loader::NodeLoader;
use crate::parser::DocumentParser;
use crate::reference::{ReferenceResolver, ResolutionContext, ResolvedReference};
use crate::source::Fetcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Tuning knobs for a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Upper bound on concurrent retrievals.
    pub max_parallel: usize,
    /// Revision used for remote references without `?ref=`.
    pub default_revision: String,
    /// Stops the build when cancelled.
    pub cancel: Option<CancellationToken>,
    /// Stops the build once this much time has passed.
    pub timeout: Option<Duration>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            default_revision: DEFAULT_REVISION.to_string(),
            cancel: None,
            timeout: None,
        }
    }
}

impl BuildOptions {
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    #[must_use]
    pub fn with_default_revision(mut self, revision: impl Into<String>) -> Self {
        self.default_revision = revision.into();
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Builds dependency graphs from root overlays.
///
/// A builder can run any number of builds; each build gets a fresh loader so
/// results never leak from one build into the next.
pub struct GraphBuilder {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn DocumentParser>,
    resolver: ReferenceResolver,
    options: BuildOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Complete,
}

/// One overlay on the depth-first path.
struct Frame {
    node: Arc<Node>,
    /// Type of the edge the node was entered through; `None` for roots.
    entered_by: Option<ReferenceType>,
    targets: Vec<(DeclaredReference, ResolvedReference)>,
    next: usize,
}

/// Mutable state of one build. Only the driver touches it.
struct BuildState {
    loader: Arc<NodeLoader>,
    visits: HashMap<NodeIdentity, Visit>,
    /// First request for each identity; later awaits reuse its arguments.
    requested: HashMap<NodeIdentity, (TargetShape, ReferenceType)>,
    nodes: Vec<Arc<Node>>,
    edges: Vec<Edge>,
    prefetch: JoinSet<()>,
    deadline: Option<Instant>,
}

impl GraphBuilder {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn DocumentParser>,
        options: BuildOptions,
    ) -> Self {
        Self {
            fetcher,
            parser,
            resolver: ReferenceResolver,
            options,
        }
    }

    pub const fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Discovers everything reachable from `roots` and returns the graph.
    ///
    /// Roots are overlay identities; duplicates are ignored. An empty root
    /// list produces an empty graph.
    ///
    /// # Errors
    ///
    /// [`KustgraphError::ReferenceSyntax`], [`KustgraphError::NodeNotFound`]
    /// and [`KustgraphError::NodeMalformed`] carry the declaring chain;
    /// [`KustgraphError::CycleDetected`] names the cycle;
    /// [`KustgraphError::BuildCancelled`] is returned when the cancellation
    /// token fires or the timeout passes. No partial graph is ever returned.
    pub async fn build(&self, roots: &[NodeIdentity]) -> Result<Graph, KustgraphError> {
        let started = Instant::now();
        let mut state = BuildState {
            loader: Arc::new(NodeLoader::new(
                self.fetcher.clone(),
                self.parser.clone(),
                self.options.max_parallel,
            )),
            visits: HashMap::new(),
            requested: HashMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            prefetch: JoinSet::new(),
            deadline: self.options.timeout.map(|t| started + t),
        };

        let result = self.walk(&mut state, roots).await;
        state.prefetch.abort_all();
        result?;

        let mut unique_roots: Vec<NodeIdentity> = Vec::with_capacity(roots.len());
        for root in roots {
            if !unique_roots.contains(root) {
                unique_roots.push(root.clone());
            }
        }

        let nodes = state.nodes.into_iter().map(Arc::unwrap_or_clone).collect();
        let graph = Graph::from_parts(unique_roots, nodes, state.edges)?;

        if let Some(cycle) = find_structural_cycle(&graph) {
            return Err(KustgraphError::CycleDetected { cycle });
        }

        tracing::info!(
            "Built graph from {} root(s): {} nodes, {} edges in {:.2?}",
            graph.roots().len(),
            graph.node_count(),
            graph.edge_count(),
            started.elapsed()
        );
        Ok(graph)
    }

    async fn walk(&self, state: &mut BuildState, roots: &[NodeIdentity]) -> Result<(), KustgraphError> {
        self.check_cancelled(state)?;

        for root in roots {
            if state.visits.contains_key(root) {
                continue;
            }
            tracing::debug!("Discovering from root {root}");
            let node = self
                .await_load(state, root, TargetShape::Overlay, ReferenceType::Resource)
                .await
                .map_err(|e| e.with_origin(&root.to_string(), &[]))?;
            let root_frame = self.enter(state, node, None, &[])?;
            let mut stack = vec![root_frame];

            while let Some(frame) = stack.last_mut() {
                let Some((declared, resolved)) = frame.targets.get(frame.next).cloned() else {
                    state.visits.insert(frame.node.identity.clone(), Visit::Complete);
                    stack.pop();
                    continue;
                };
                let order = frame.next;
                frame.next += 1;
                let source = frame.node.identity.clone();
                let target = resolved.identity.clone();

                match state.visits.get(&target).copied() {
                    Some(Visit::InProgress) => {
                        if let Some(cycle) = closed_cycle(&stack, &target, declared.reference_type) {
                            return Err(KustgraphError::CycleDetected { cycle });
                        }
                    }
                    Some(Visit::Complete) => {}
                    None => {
                        let (shape, discovered_by) = state
                            .requested
                            .get(&target)
                            .copied()
                            .unwrap_or((resolved.shape, declared.reference_type));
                        let chain = chain_of(&stack);
                        let node = self
                            .await_load(state, &target, shape, discovered_by)
                            .await
                            .map_err(|e| e.with_origin(&declared.raw, &chain))?;
                        let frame = self.enter(state, node, Some(declared.reference_type), &chain)?;
                        stack.push(frame);
                    }
                }

                tracing::debug!("Edge {source} -[{}]-> {target}", declared.reference_type);
                state.edges.push(Edge {
                    source,
                    target,
                    edge_type: declared.reference_type,
                    order,
                    reference: declared.raw,
                });
            }
        }
        Ok(())
    }

    /// Records a freshly loaded node, resolves its references and prefetches
    /// their targets.
    fn enter(
        &self,
        state: &mut BuildState,
        node: Arc<Node>,
        entered_by: Option<ReferenceType>,
        parent_chain: &[NodeIdentity],
    ) -> Result<Frame, KustgraphError> {
        state.visits.insert(node.identity.clone(), Visit::InProgress);
        state.nodes.push(node.clone());

        let mut chain = parent_chain.to_vec();
        chain.push(node.identity.clone());

        let context = ResolutionContext::new(node.identity.clone(), &self.options.default_revision);
        let mut targets = Vec::with_capacity(node.declared_references.len());
        for declared in &node.declared_references {
            let resolved = self
                .resolver
                .resolve(&declared.raw, declared.reference_type, &context)
                .map_err(|e| e.with_origin(&declared.raw, &chain))?;
            targets.push((declared.clone(), resolved));
        }

        for (declared, resolved) in &targets {
            if state.requested.contains_key(&resolved.identity) || state.visits.contains_key(&resolved.identity) {
                continue;
            }
            let request = (resolved.shape, declared.reference_type);
            state.requested.insert(resolved.identity.clone(), request);

            let loader = state.loader.clone();
            let cancel = self.options.cancel.clone();
            let identity = resolved.identity.clone();
            state.prefetch.spawn(async move {
                if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    return;
                }
                // outcome is cached in the loader; the driver reports errors
                let _ = loader.load(&identity, request.0, request.1).await;
            });
        }

        Ok(Frame {
            node,
            entered_by,
            targets,
            next: 0,
        })
    }

    async fn await_load(
        &self,
        state: &mut BuildState,
        identity: &NodeIdentity,
        shape: TargetShape,
        discovered_by: ReferenceType,
    ) -> Result<Arc<Node>, KustgraphError> {
        self.check_cancelled(state)?;
        state.requested.entry(identity.clone()).or_insert((shape, discovered_by));

        let load = state.loader.load(identity, shape, discovered_by);
        tokio::select! {
            biased;
            () = wait_cancelled(self.options.cancel.as_ref()) => Err(cancelled("cancelled by caller")),
            () = wait_deadline(state.deadline) => Err(cancelled("deadline exceeded")),
            result = load => result,
        }
    }

    fn check_cancelled(&self, state: &BuildState) -> Result<(), KustgraphError> {
        if self.options.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(cancelled("cancelled by caller"));
        }
        if state.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(cancelled("deadline exceeded"));
        }
        Ok(())
    }
}

/// The Base/Component cycle closed by an edge into `target`, if any.
///
/// `target` is on the stack; the edge closes a structural cycle only when it
/// and every edge on the stack below `target` are Base/Component edges.
fn closed_cycle(
    stack: &[Frame],
    target: &NodeIdentity,
    edge_type: ReferenceType,
) -> Option<Vec<NodeIdentity>> {
    if !edge_type.is_structural() {
        return None;
    }
    let begin = stack.iter().position(|f| &f.node.identity == target)?;
    let structural = stack[begin + 1..]
        .iter()
        .all(|f| f.entered_by.is_some_and(ReferenceType::is_structural));
    structural.then(|| {
        let mut cycle = chain_of(&stack[begin..]);
        cycle.push(target.clone());
        cycle
    })
}

fn chain_of(stack: &[Frame]) -> Vec<NodeIdentity> {
    stack.iter().map(|f| f.node.identity.clone()).collect()
}

fn cancelled(reason: &str) -> KustgraphError {
    KustgraphError::BuildCancelled {
        reason: reason.to_string(),
    }
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
