//! Finding overlays on disk.
//!
//! A build needs root identities. For a whole apps directory those are all
//! directories holding a kustomization file; [`discover_overlays`] walks the
//! tree with `walkdir` and returns them sorted. Hidden directories such as
//! `.git` are skipped.
//!
//! The helpers below map user-supplied paths (relative to the working
//! directory, pointing at a directory or at a kustomization file) onto graph
//! identities.

use crate::core::{KustgraphError, NodeIdentity, is_kustomization_file_name};
use crate::utils::absolute_path;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

/// Every directory under `apps_dir` (itself included) that contains a
/// kustomization file, sorted.
///
/// # Errors
///
/// Returns an IO error when `apps_dir` is not a readable directory or a
/// directory below it cannot be listed.
pub fn discover_overlays(apps_dir: &Path) -> Result<Vec<NodeIdentity>, KustgraphError> {
    let root = absolute_path(apps_dir)?;
    if !root.is_dir() {
        return Err(KustgraphError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("apps directory {} does not exist or is not a directory", root.display()),
        )));
    }

    let mut overlays = BTreeSet::new();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            e.into_io_error()
                .map_or(KustgraphError::Other { message }, KustgraphError::IoError)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_kustomization = entry.file_name().to_str().is_some_and(is_kustomization_file_name);
        if is_kustomization && let Some(dir) = entry.path().parent() {
            overlays.insert(NodeIdentity::local(dir));
        }
    }

    tracing::debug!("Discovered {} overlays under {}", overlays.len(), root.display());
    Ok(overlays.into_iter().collect())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Identity of the overlay named by `path`: the directory itself, or the
/// directory of a kustomization file.
///
/// Relative paths are taken relative to the working directory.
pub fn overlay_identity(path: &Path) -> Result<NodeIdentity, KustgraphError> {
    let absolute = absolute_path(path)?;
    let names_kustomization = absolute
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_kustomization_file_name);

    if names_kustomization
        && absolute.is_file()
        && let Some(dir) = absolute.parent()
    {
        return Ok(NodeIdentity::local(dir));
    }
    Ok(NodeIdentity::local(absolute))
}
