//! Canonical node identities.
//!
//! A [`NodeIdentity`] is the key every node is stored under. Local nodes are
//! identified by an absolute, lexically normalized path; remote nodes by a
//! [`RemoteLocator`] made of a normalized repository URL, a revision and a
//! sub-path inside the repository. Overlay identities always denote the
//! directory, never the kustomization file inside it.
//!
//! Identities are totally ordered (local before remote, then lexically) so any
//! output derived from a graph can be sorted reproducibly.

use crate::utils::{normalize_path, normalize_repo_path};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Location of a node inside a remote repository at a given revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteLocator {
    /// Normalized repository URL (lower-case host, no credentials, no `.git`).
    pub repository: String,
    /// Revision to check out; the configured default when none was given.
    pub revision: String,
    /// `/`-separated path inside the repository, empty for the root.
    pub path: String,
}

impl RemoteLocator {
    /// Returns a locator for `relative` resolved against this locator's path,
    /// or `None` if it climbs above the repository root.
    #[must_use]
    pub fn join(&self, relative: &str) -> Option<Self> {
        let joined = if self.path.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.path, relative)
        };
        Some(Self {
            repository: self.repository.clone(),
            revision: self.revision.clone(),
            path: normalize_repo_path(&joined)?,
        })
    }

    /// Parent locator, or `None` at the repository root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.path.is_empty() {
            return None;
        }
        let parent = self.path.rsplit_once('/').map_or("", |(head, _)| head);
        Some(Self {
            repository: self.repository.clone(),
            revision: self.revision.clone(),
            path: parent.to_string(),
        })
    }
}

impl fmt::Display for RemoteLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}?ref={}", self.repository, self.revision)
        } else {
            write!(f, "{}//{}?ref={}", self.repository, self.path, self.revision)
        }
    }
}

/// The unique key of a node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeIdentity {
    /// An absolute, normalized local path.
    Local(PathBuf),
    /// A location inside a remote repository.
    Remote(RemoteLocator),
}

impl NodeIdentity {
    /// Creates a local identity, normalizing `.`/`..` segments.
    ///
    /// The caller is responsible for passing an absolute path; relative paths
    /// are kept relative (the resolver always joins them against a context
    /// first).
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(normalize_path(path.as_ref()))
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The local path, if this is a local identity.
    #[must_use]
    pub fn as_local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// The final path segment, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Local(path) => path.file_name().and_then(|n| n.to_str()),
            Self::Remote(locator) => locator
                .path
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Lower-cased extension of the final segment, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Identity of a child entry (used to probe kustomization files).
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        match self {
            Self::Local(path) => Self::Local(path.join(name)),
            Self::Remote(locator) => Self::Remote(RemoteLocator {
                repository: locator.repository.clone(),
                revision: locator.revision.clone(),
                path: if locator.path.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", locator.path, name)
                },
            }),
        }
    }

    /// Identity of the containing directory, if there is one.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Local(path) => path.parent().map(|p| Self::Local(p.to_path_buf())),
            Self::Remote(locator) => locator.parent().map(Self::Remote),
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(locator) => locator.fmt(f),
        }
    }
}

impl Serialize for NodeIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<PathBuf> for NodeIdentity {
    fn from(path: PathBuf) -> Self {
        Self::local(path)
    }
}

impl From<&Path> for NodeIdentity {
    fn from(path: &Path) -> Self {
        Self::local(path)
    }
}

/// Renders a declaring chain as `root → … → node`.
#[must_use]
pub fn format_chain(chain: &[NodeIdentity]) -> String {
    chain.iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
}
