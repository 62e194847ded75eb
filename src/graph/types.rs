//! Node and edge records stored in a [`Graph`](super::Graph).

use crate::core::{EdgeType, NodeIdentity, NodeKind, ReferenceType};
use serde::Serialize;
use serde_yaml::Value;

/// One reference as written in an overlay, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeclaredReference {
    /// The reference string exactly as declared.
    pub raw: String,
    /// Which declaration field it came from.
    pub reference_type: ReferenceType,
}

impl DeclaredReference {
    pub fn new(raw: impl Into<String>, reference_type: ReferenceType) -> Self {
        Self {
            raw: raw.into(),
            reference_type,
        }
    }
}

/// `kind` and `metadata.name` of a Kubernetes object found in a leaf file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceSummary {
    pub kind: Option<String>,
    pub name: Option<String>,
}

/// An overlay directory or a standalone file.
///
/// Created once when first discovered and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub identity: NodeIdentity,
    pub kind: NodeKind,
    /// References in declaration order; always empty for leaf kinds.
    pub declared_references: Vec<DeclaredReference>,
    /// Parsed documents. Overlays hold exactly one mapping; leaves without a
    /// manifest extension hold none.
    #[serde(skip)]
    pub documents: Vec<Value>,
    /// For overlays, the kustomization file that was read.
    pub manifest: Option<NodeIdentity>,
}

impl Node {
    #[must_use]
    pub const fn is_overlay(&self) -> bool {
        matches!(self.kind, NodeKind::Overlay)
    }

    /// Summaries of the Kubernetes objects in a leaf's documents.
    ///
    /// Documents without a `kind` or `metadata.name` still produce an entry
    /// with the missing half set to `None`; overlays produce nothing.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceSummary> {
        if self.is_overlay() {
            return Vec::new();
        }
        self.documents
            .iter()
            .filter(|doc| doc.is_mapping())
            .map(|doc| ResourceSummary {
                kind: doc.get("kind").and_then(Value::as_str).map(str::to_string),
                name: doc
                    .get("metadata")
                    .and_then(|m| m.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect()
    }

    /// The file backing this node: the kustomization file for overlays, the
    /// node itself for leaves.
    #[must_use]
    pub fn file_identity(&self) -> &NodeIdentity {
        self.manifest.as_ref().unwrap_or(&self.identity)
    }
}

/// A typed, ordered dependency from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: NodeIdentity,
    pub target: NodeIdentity,
    pub edge_type: EdgeType,
    /// Position of the reference among the source's declared references.
    pub order: usize,
    /// The reference string that produced this edge.
    pub reference: String,
}
