//! Reference and node classification types.
//!
//! Every reference declared inside a kustomization carries a [`ReferenceType`]
//! that records which declaration field it came from. The same enum doubles as
//! the edge label in the dependency graph ([`EdgeType`]), so a graph edge always
//! mirrors the declaration that produced it.
//!
//! Nodes are classified once, at load time, into a closed set of
//! [`NodeKind`]s. The kind never changes afterwards and is never re-derived by
//! inspecting document content later on.
//!
//! # Examples
//!
//! ```rust
//! use kustgraph_cli::core::{NodeKind, ReferenceType};
//!
//! assert!(ReferenceType::Base.is_structural());
//! assert!(!ReferenceType::Patch.is_structural());
//! assert_eq!(NodeKind::from_reference(ReferenceType::Patch), NodeKind::PatchFile);
//!
//! let parsed: ReferenceType = "component".parse().unwrap();
//! assert_eq!(parsed, ReferenceType::Component);
//! ```

use serde::{Deserialize, Serialize};

/// The declaration category a reference belongs to.
///
/// Variants are ordered by how kustomize layers content: bases and
/// components form the structural backbone, the remaining variants pull leaf
/// artifacts into an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    /// A legacy `bases` entry: this overlay extends the referenced overlay.
    Base,

    /// A `resources` entry: either a manifest file or another overlay directory.
    Resource,

    /// A `components` entry: a reusable overlay mixed into this one.
    Component,

    /// A patch file from `patches`, `patchesStrategicMerge` or `patchesJson6902`.
    Patch,

    /// An input file of a generator (`configMapGenerator`, `secretGenerator`,
    /// `generators`).
    Generator,
}

/// Edge labels mirror the reference type that created the edge.
pub type EdgeType = ReferenceType;

impl ReferenceType {
    /// All reference types, in declaration-field order.
    pub const ALL: [ReferenceType; 5] = [
        ReferenceType::Base,
        ReferenceType::Resource,
        ReferenceType::Component,
        ReferenceType::Patch,
        ReferenceType::Generator,
    ];

    /// Reference types forming the acyclic backbone of the graph.
    pub const STRUCTURAL: [ReferenceType; 2] = [ReferenceType::Base, ReferenceType::Component];

    /// Returns `true` for Base and Component references.
    ///
    /// Structural edges mark the source as depending on the target being fully
    /// resolved first, which is why cycles among them are fatal.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, ReferenceType::Base | ReferenceType::Component)
    }

    /// Lower-case label used in CLI output and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Base => "base",
            ReferenceType::Resource => "resource",
            ReferenceType::Component => "component",
            ReferenceType::Patch => "patch",
            ReferenceType::Generator => "generator",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReferenceType {
    type Err = crate::core::KustgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "base" | "bases" => Ok(ReferenceType::Base),
            "resource" | "resources" => Ok(ReferenceType::Resource),
            "component" | "components" => Ok(ReferenceType::Component),
            "patch" | "patches" => Ok(ReferenceType::Patch),
            "generator" | "generators" => Ok(ReferenceType::Generator),
            _ => Err(crate::core::KustgraphError::Other {
                message: format!(
                    "Unknown reference type '{s}' (expected base, resource, component, patch or generator)"
                ),
            }),
        }
    }
}

/// Closed classification of a graph node, decided once by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// A directory holding a kustomization file.
    Overlay,
    /// A manifest pulled in through `resources`.
    ResourceFile,
    /// A patch file.
    PatchFile,
    /// A generator input file.
    GeneratorSpec,
}

impl NodeKind {
    /// Classify a file-shaped node by the reference type that discovered it.
    ///
    /// Structural reference types never point at files (the resolver rejects
    /// them), so they fall back to [`NodeKind::ResourceFile`] like any other
    /// unclassified leaf.
    #[must_use]
    pub const fn from_reference(reference_type: ReferenceType) -> Self {
        match reference_type {
            ReferenceType::Patch => NodeKind::PatchFile,
            ReferenceType::Generator => NodeKind::GeneratorSpec,
            ReferenceType::Base | ReferenceType::Resource | ReferenceType::Component => {
                NodeKind::ResourceFile
            }
        }
    }

    /// Returns `true` for leaf kinds, which never have outgoing edges.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        !matches!(self, NodeKind::Overlay)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Overlay => write!(f, "overlay"),
            NodeKind::ResourceFile => write!(f, "resource-file"),
            NodeKind::PatchFile => write!(f, "patch-file"),
            NodeKind::GeneratorSpec => write!(f, "generator-spec"),
        }
    }
}

/// What a resolved reference points at, decided from syntax alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetShape {
    /// A directory-like overlay; its kustomization file is probed at load time.
    Overlay,
    /// A single file.
    File,
}
