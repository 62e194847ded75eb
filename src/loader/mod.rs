//! Node loading with per-identity single-flight.
//!
//! [`NodeLoader::load`] turns an identity into a [`Node`]: it retrieves the
//! content through a [`Fetcher`], parses it with a [`DocumentParser`] and, for
//! overlays, extracts the declared references (see [`extractor`]).
//!
//! Every identity is loaded at most once per loader. Concurrent callers for
//! the same identity share one `tokio::sync::OnceCell`: the first caller runs
//! the load, the others await it and receive the same result, success or
//! failure. Actual retrieval is bounded by a semaphore so that no more than
//! `max_parallel` fetches are in flight.

pub mod extractor;

use crate::constants::KUSTOMIZATION_FILE_NAMES;
use crate::core::{
    KustgraphError, NodeIdentity, NodeKind, ReferenceType, TargetShape, has_manifest_extension,
};
use crate::graph::Node;
use crate::parser::DocumentParser;
use crate::source::{FetchError, Fetcher};
use dashmap::DashMap;
use serde_yaml::Value;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};

pub use extractor::extract_references;

type LoadCell = Arc<OnceCell<Result<Arc<Node>, KustgraphError>>>;

/// Loads nodes on demand, caching every outcome by identity.
pub struct NodeLoader {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn DocumentParser>,
    permits: Semaphore,
    cells: DashMap<NodeIdentity, LoadCell>,
}

impl NodeLoader {
    /// Creates a loader allowing at most `max_parallel` concurrent fetches.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn DocumentParser>,
        max_parallel: usize,
    ) -> Self {
        Self {
            fetcher,
            parser,
            permits: Semaphore::new(max_parallel.max(1)),
            cells: DashMap::new(),
        }
    }

    /// Loads `identity` as a `shape` target discovered through a
    /// `discovered_by` reference.
    ///
    /// Only the first call for an identity decides its kind; later calls get
    /// the cached node whatever arguments they pass.
    ///
    /// # Errors
    ///
    /// - [`KustgraphError::NodeNotFound`] when nothing exists at the identity
    ///   (for overlays: none of the kustomization file names exists)
    /// - [`KustgraphError::NodeMalformed`] when the content cannot be parsed or
    ///   has the wrong shape
    /// - any retrieval failure reported by the fetcher
    ///
    /// Errors carry no declaring chain; the builder attaches it.
    pub async fn load(
        &self,
        identity: &NodeIdentity,
        shape: TargetShape,
        discovered_by: ReferenceType,
    ) -> Result<Arc<Node>, KustgraphError> {
        let cell = self.cells.entry(identity.clone()).or_default().clone();
        cell.get_or_init(|| async {
            self.load_uncached(identity, shape, discovered_by)
                .await
                .map(Arc::new)
        })
        .await
        .clone()
    }

    /// Number of identities requested so far, loaded or in flight.
    pub fn requested_count(&self) -> usize {
        self.cells.len()
    }

    async fn load_uncached(
        &self,
        identity: &NodeIdentity,
        shape: TargetShape,
        discovered_by: ReferenceType,
    ) -> Result<Node, KustgraphError> {
        let _permit = self.permits.acquire().await.map_err(|_| KustgraphError::Other {
            message: "node loader has been shut down".to_string(),
        })?;

        match shape {
            TargetShape::Overlay => self.load_overlay(identity).await,
            TargetShape::File => self.load_file(identity, NodeKind::from_reference(discovered_by)).await,
        }
    }

    async fn load_overlay(&self, identity: &NodeIdentity) -> Result<Node, KustgraphError> {
        for name in KUSTOMIZATION_FILE_NAMES {
            let manifest = identity.child(name);
            let bytes = match self.fetcher.fetch(&manifest).await {
                Ok(bytes) => bytes,
                Err(FetchError::NotFound) => continue,
                Err(FetchError::Disabled) => {
                    tracing::warn!("Remote retrieval disabled; treating {identity} as an opaque overlay");
                    return Ok(Node {
                        identity: identity.clone(),
                        kind: NodeKind::Overlay,
                        declared_references: Vec::new(),
                        documents: Vec::new(),
                        manifest: None,
                    });
                }
                Err(FetchError::Failed(e)) => return Err(e),
            };

            tracing::debug!("Loading overlay {identity} from {name}");
            let mut documents = self.parse(identity, &bytes)?;
            if documents.len() != 1 {
                return Err(malformed(
                    identity,
                    format!("{name} must hold exactly one YAML document, found {}", documents.len()),
                ));
            }
            let document = documents.remove(0);
            let Some(mapping) = document.as_mapping() else {
                return Err(malformed(identity, format!("{name} is not a YAML mapping")));
            };
            let declared_references =
                extract_references(mapping).map_err(|reason| malformed(identity, reason))?;

            return Ok(Node {
                identity: identity.clone(),
                kind: NodeKind::Overlay,
                declared_references,
                documents: vec![document],
                manifest: Some(manifest),
            });
        }

        Err(not_found(identity))
    }

    async fn load_file(&self, identity: &NodeIdentity, kind: NodeKind) -> Result<Node, KustgraphError> {
        let bytes = match self.fetcher.fetch(identity).await {
            Ok(bytes) => bytes,
            Err(FetchError::NotFound | FetchError::Disabled) => return Err(not_found(identity)),
            Err(FetchError::Failed(e)) => return Err(e),
        };

        let is_manifest = identity.file_name().is_some_and(has_manifest_extension);
        let documents = if is_manifest {
            let documents = self.parse(identity, &bytes)?;
            if let Some(i) = documents
                .iter()
                .position(|doc| !matches!(doc, Value::Mapping(_) | Value::Null))
            {
                return Err(malformed(identity, format!("document {} is not a YAML mapping", i + 1)));
            }
            documents
        } else {
            Vec::new()
        };

        tracing::debug!("Loaded {kind} {identity} ({} documents)", documents.len());
        Ok(Node {
            identity: identity.clone(),
            kind,
            declared_references: Vec::new(),
            documents,
            manifest: None,
        })
    }

    fn parse(&self, identity: &NodeIdentity, bytes: &[u8]) -> Result<Vec<Value>, KustgraphError> {
        self.parser
            .parse(bytes)
            .map_err(|e| malformed(identity, e.message))
    }
}

fn not_found(identity: &NodeIdentity) -> KustgraphError {
    KustgraphError::NodeNotFound {
        identity: identity.clone(),
        reference: String::new(),
        chain: Vec::new(),
    }
}

fn malformed(identity: &NodeIdentity, reason: String) -> KustgraphError {
    KustgraphError::NodeMalformed {
        identity: identity.clone(),
        reason,
        reference: String::new(),
        chain: Vec::new(),
    }
}
