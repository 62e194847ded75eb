//! Reference resolution.
//!
//! Turns a raw reference string declared inside an overlay into a canonical
//! [`NodeIdentity`] plus a [`TargetShape`], without reading anything from
//! storage. Resolution is pure: the same reference in the same
//! [`ResolutionContext`] always yields the same identity, and missing targets
//! are never reported here (that is the loader's job).
//!
//! # Rules
//!
//! - Relative paths resolve against the declaring overlay's directory, or its
//!   sub-path when the overlay lives in a remote repository. A relative path
//!   inside a remote overlay stays in the same repository and revision.
//! - Absolute local paths are only normalized.
//! - Remote locators (see [`remote`]) resolve to a remote identity with the
//!   context's default revision filled in.
//! - Bases and components always name overlays; naming the kustomization file
//!   itself collapses to its directory.
//! - Resources name a file when the last segment has a `.yaml`, `.yml` or
//!   `.json` extension and an overlay otherwise.
//! - Patches and generator inputs always name files.
//!
//! # Examples
//!
//! ```rust
//! use kustgraph_cli::core::{NodeIdentity, ReferenceType, TargetShape};
//! use kustgraph_cli::reference::{ReferenceResolver, ResolutionContext};
//!
//! let ctx = ResolutionContext::new(NodeIdentity::local("/repo/apps/prod"), "HEAD");
//! let resolved = ReferenceResolver.resolve("../base", ReferenceType::Base, &ctx).unwrap();
//! assert_eq!(resolved.identity, NodeIdentity::local("/repo/apps/base"));
//! assert_eq!(resolved.shape, TargetShape::Overlay);
//! ```

pub mod remote;

use crate::core::{
    KustgraphError, NodeIdentity, ReferenceType, TargetShape, has_manifest_extension,
    is_kustomization_file_name,
};
use std::path::Path;

pub use remote::{is_remote_syntax, parse_remote};

/// Everything a resolve call needs to know about where it is resolving from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    /// Identity of the declaring overlay (its directory).
    pub base: NodeIdentity,
    /// Revision applied to remote locators that do not name one.
    pub default_revision: String,
}

impl ResolutionContext {
    pub fn new(base: NodeIdentity, default_revision: impl Into<String>) -> Self {
        Self {
            base,
            default_revision: default_revision.into(),
        }
    }
}

/// Result of resolving one reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedReference {
    pub identity: NodeIdentity,
    pub shape: TargetShape,
}

/// Stateless resolver from raw reference strings to identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    /// Resolves `raw`, declared as a `reference_type` reference, in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`KustgraphError::ReferenceSyntax`] for empty or multi-line
    /// references, malformed remote locators, paths climbing out of a remote
    /// repository, and structural references naming a plain manifest file.
    /// The error's chain is left empty for the caller to fill in.
    pub fn resolve(
        &self,
        raw: &str,
        reference_type: ReferenceType,
        context: &ResolutionContext,
    ) -> Result<ResolvedReference, KustgraphError> {
        let reference = raw.trim();
        if reference.is_empty() {
            return Err(syntax_error(raw, "empty reference"));
        }
        if reference.contains('\n') {
            return Err(syntax_error(raw, "reference spans multiple lines"));
        }

        if is_remote_syntax(reference) {
            if !matches!(
                reference_type,
                ReferenceType::Base | ReferenceType::Resource | ReferenceType::Component
            ) {
                return Err(syntax_error(
                    raw,
                    &format!("a {reference_type} must be a file, not a remote locator"),
                ));
            }
            let locator = parse_remote(reference, &context.default_revision)
                .map_err(|reason| syntax_error(raw, &reason))?;
            let identity = NodeIdentity::Remote(locator);
            return Ok(ResolvedReference {
                identity: collapse_kustomization(identity),
                shape: TargetShape::Overlay,
            });
        }

        let identity = match &context.base {
            NodeIdentity::Local(dir) => {
                let path = Path::new(reference);
                if path.is_absolute() {
                    NodeIdentity::local(path)
                } else {
                    NodeIdentity::local(dir.join(path))
                }
            }
            NodeIdentity::Remote(locator) => {
                if reference.starts_with('/') {
                    return Err(syntax_error(
                        raw,
                        "absolute paths are not allowed inside a remote overlay",
                    ));
                }
                let joined = locator.join(reference).ok_or_else(|| {
                    syntax_error(raw, "path climbs above the repository root")
                })?;
                NodeIdentity::Remote(joined)
            }
        };

        classify(raw, reference_type, identity)
    }
}

fn classify(
    raw: &str,
    reference_type: ReferenceType,
    identity: NodeIdentity,
) -> Result<ResolvedReference, KustgraphError> {
    let name = identity.file_name().unwrap_or_default().to_string();
    let names_kustomization = is_kustomization_file_name(&name);

    let (identity, shape) = match reference_type {
        ReferenceType::Base | ReferenceType::Component => {
            if names_kustomization {
                (collapse_kustomization(identity), TargetShape::Overlay)
            } else if has_manifest_extension(&name) {
                return Err(syntax_error(
                    raw,
                    &format!("a {reference_type} must name an overlay directory, not a manifest file"),
                ));
            } else {
                (identity, TargetShape::Overlay)
            }
        }
        ReferenceType::Resource => {
            if names_kustomization {
                (collapse_kustomization(identity), TargetShape::Overlay)
            } else if has_manifest_extension(&name) {
                (identity, TargetShape::File)
            } else {
                (identity, TargetShape::Overlay)
            }
        }
        ReferenceType::Patch | ReferenceType::Generator => (identity, TargetShape::File),
    };

    Ok(ResolvedReference { identity, shape })
}

/// Maps an identity naming a kustomization file to its directory.
fn collapse_kustomization(identity: NodeIdentity) -> NodeIdentity {
    let names_kustomization = identity.file_name().is_some_and(is_kustomization_file_name);
    if names_kustomization && let Some(parent) = identity.parent() {
        return parent;
    }
    identity
}

fn syntax_error(raw: &str, reason: &str) -> KustgraphError {
    KustgraphError::ReferenceSyntax {
        reference: raw.to_string(),
        reason: reason.to_string(),
        chain: Vec::new(),
    }
}
