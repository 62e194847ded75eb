//! Retrieval collaborators.
//!
//! The loader obtains raw bytes through the [`Fetcher`] trait and never
//! touches storage directly. Three implementations ship with the crate:
//!
//! - [`FsFetcher`] - local identities, read with `tokio::fs`
//! - [`GitFetcher`] - remote identities, read from cached shallow checkouts
//! - [`SourceFetcher`] - dispatches to one of the above by identity kind
//!
//! A fetcher only ever reports one of three outcomes besides success: the
//! target does not exist ([`FetchError::NotFound`]), remote retrieval is
//! switched off ([`FetchError::Disabled`]), or retrieval itself failed.

pub mod git;

use crate::core::{KustgraphError, NodeIdentity};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use thiserror::Error;

pub use git::{GitFetcher, GitFetcherConfig};

/// Failure modes of a [`Fetcher`].
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Nothing exists at the identity.
    #[error("not found")]
    NotFound,

    /// Remote retrieval has been disabled by configuration.
    #[error("remote retrieval is disabled")]
    Disabled,

    /// Retrieval failed for another reason (IO, git).
    #[error(transparent)]
    Failed(#[from] KustgraphError),
}

/// Retrieves the raw content of a node.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the bytes stored at `identity`.
    ///
    /// Directories are not fetchable; asking for one yields
    /// [`FetchError::NotFound`].
    async fn fetch(&self, identity: &NodeIdentity) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, identity: &NodeIdentity) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(identity).await
    }
}

/// Reads local identities from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFetcher;

#[async_trait]
impl Fetcher for FsFetcher {
    async fn fetch(&self, identity: &NodeIdentity) -> Result<Vec<u8>, FetchError> {
        let Some(path) = identity.as_local_path() else {
            return Err(FetchError::Failed(KustgraphError::Other {
                message: format!("filesystem fetcher cannot read remote identity {identity}"),
            }));
        };
        read_file(path).await
    }
}

/// Reads a file, mapping "nothing usable here" errors to [`FetchError::NotFound`].
pub(crate) async fn read_file(path: &std::path::Path) -> Result<Vec<u8>, FetchError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            tracing::trace!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory
            ) =>
        {
            Err(FetchError::NotFound)
        }
        Err(e) => Err(FetchError::Failed(KustgraphError::IoError(e))),
    }
}

/// Dispatches local identities to [`FsFetcher`] and remote ones to
/// [`GitFetcher`].
///
/// Without a git fetcher every remote identity yields
/// [`FetchError::Disabled`].
pub struct SourceFetcher {
    local: FsFetcher,
    remote: Option<GitFetcher>,
}

impl SourceFetcher {
    /// Local-only fetcher.
    #[must_use]
    pub const fn local_only() -> Self {
        Self {
            local: FsFetcher,
            remote: None,
        }
    }

    /// Fetcher resolving remote identities through `git`.
    #[must_use]
    pub const fn with_git(git: GitFetcher) -> Self {
        Self {
            local: FsFetcher,
            remote: Some(git),
        }
    }
}

#[async_trait]
impl Fetcher for SourceFetcher {
    async fn fetch(&self, identity: &NodeIdentity) -> Result<Vec<u8>, FetchError> {
        match (identity, &self.remote) {
            (NodeIdentity::Local(_), _) => self.local.fetch(identity).await,
            (NodeIdentity::Remote(_), Some(git)) => git.fetch(identity).await,
            (NodeIdentity::Remote(_), None) => Err(FetchError::Disabled),
        }
    }
}
