//! Lexical path helpers.
//!
//! Nothing in here touches the filesystem: identities must be derivable from
//! the reference text alone, so `.`/`..` handling is purely syntactic and
//! symbolic links are never followed.

use std::path::{Component, Path, PathBuf};

/// Normalizes a path by resolving `.` and `..` components.
///
/// The absolute or relative nature of the path is kept. A `..` at the root of
/// an absolute path is dropped, mirroring how the operating system treats
/// `/..`.
///
/// # Examples
///
/// ```rust
/// use kustgraph_cli::utils::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_path(Path::new("/apps/./prod/../base")), PathBuf::from("/apps/base"));
/// assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Makes `path` absolute against the current directory, then normalizes it.
pub fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize_path(&std::path::absolute(path)?))
}

/// Normalizes a `/`-separated sub-path inside a repository.
///
/// Returns `None` when the path climbs above the repository root. The result
/// has no leading or trailing slash; the repository root is the empty string.
///
/// ```rust
/// use kustgraph_cli::utils::normalize_repo_path;
///
/// assert_eq!(normalize_repo_path("/deploy/./base/").as_deref(), Some("deploy/base"));
/// assert_eq!(normalize_repo_path("a/../..").as_deref(), None);
/// ```
#[must_use]
pub fn normalize_repo_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}

/// Expresses `path` relative to `base`, walking up with `..` when needed.
///
/// Both paths are expected to be absolute and normalized. Returns `.` when
/// they are equal.
#[must_use]
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();

    let common = path_parts.iter().zip(&base_parts).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

/// Renders a path with forward slashes for stable, platform-neutral output.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir => Some(".".to_string()),
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
