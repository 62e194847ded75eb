//! Core types shared by every layer of the engine
//!
//! - [`error`] - [`KustgraphError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`identity`] - [`NodeIdentity`] and [`RemoteLocator`], the canonical node keys
//! - [`resource`] - [`ReferenceType`]/[`EdgeType`], [`NodeKind`] and [`TargetShape`]
//!
//! The free functions below answer the two file-name questions the resolver
//! and loader keep asking: is this a kustomization file, and does this file
//! look like a Kubernetes manifest.
//!
//! # Examples
//!
//! ```rust
//! use kustgraph_cli::core::{has_manifest_extension, is_kustomization_file_name};
//!
//! assert!(is_kustomization_file_name("kustomization.yml"));
//! assert!(!is_kustomization_file_name("deployment.yaml"));
//! assert!(has_manifest_extension("service.JSON"));
//! assert!(!has_manifest_extension("app.env"));
//! ```

pub mod error;
pub mod identity;
pub mod resource;

pub use error::{ErrorContext, KustgraphError, user_friendly_error};
pub use identity::{NodeIdentity, RemoteLocator, format_chain};
pub use resource::{EdgeType, NodeKind, ReferenceType, TargetShape};

use crate::constants::{KUSTOMIZATION_FILE_NAMES, MANIFEST_EXTENSIONS};

/// Returns `true` if `name` is one of the recognized kustomization file names.
#[must_use]
pub fn is_kustomization_file_name(name: &str) -> bool {
    KUSTOMIZATION_FILE_NAMES.contains(&name)
}

/// Returns `true` if `name` ends in `.yaml`, `.yml` or `.json` (any case).
#[must_use]
pub fn has_manifest_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            MANIFEST_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
