//! Git-backed retrieval of remote identities.
//!
//! Each (repository, revision) pair is materialized once as a shallow checkout
//! under the cache directory, using the system `git` binary:
//!
//! ```text
//! git init <staging>
//! git -C <staging> fetch --depth 1 <repository> <revision>
//! git -C <staging> checkout FETCH_HEAD
//! ```
//!
//! The staging directory is renamed into place only after a successful
//! checkout, so a crashed clone never leaves a half-populated cache entry.
//! Concurrent requests for the same checkout wait for the first one through
//! a `Pending`/`Ready` state table; a failed checkout is remembered for the
//! lifetime of the fetcher so every waiter sees the same error.

use super::{FetchError, Fetcher, read_file};
use crate::constants::{
    CLONE_RETRIES, GIT_CLONE_TIMEOUT, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS,
};
use crate::core::{KustgraphError, NodeIdentity, RemoteLocator};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Notify;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;

/// Settings for [`GitFetcher`].
#[derive(Debug, Clone)]
pub struct GitFetcherConfig {
    /// Directory holding one checkout per repository and revision.
    pub cache_dir: PathBuf,
    /// Upper bound for a single `git fetch`.
    pub clone_timeout: Duration,
}

impl GitFetcherConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            clone_timeout: GIT_CLONE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
enum CheckoutState {
    /// Another task is creating this checkout.
    Pending(Arc<Notify>),
    /// Checkout is ready at this path.
    Ready(PathBuf),
    /// Checkout failed; the error is replayed to later requesters.
    Failed(KustgraphError),
}

/// Fetches remote identities from shallow git checkouts.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    config: GitFetcherConfig,
    checkouts: Arc<DashMap<String, CheckoutState>>,
}

impl GitFetcher {
    #[must_use]
    pub fn new(config: GitFetcherConfig) -> Self {
        Self {
            config,
            checkouts: Arc::new(DashMap::new()),
        }
    }

    /// Cache directory for a repository at a revision.
    ///
    /// The name keeps the readable tail of the URL and adds a hash of the full
    /// key so distinct repositories with the same name never collide.
    #[must_use]
    pub fn checkout_dir(&self, repository: &str, revision: &str) -> PathBuf {
        let key = checkout_key(repository, revision);
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        let name: String = repository
            .rsplit(['/', ':'])
            .next()
            .unwrap_or("repo")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.config.cache_dir.join(format!("{name}-{}", &digest[..16]))
    }

    /// Returns a ready checkout for the locator's repository and revision,
    /// creating it if needed.
    pub async fn ensure_checkout(&self, locator: &RemoteLocator) -> Result<PathBuf, KustgraphError> {
        let key = checkout_key(&locator.repository, &locator.revision);
        let notify = Arc::new(Notify::new());

        loop {
            match self.checkouts.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    let existing = match entry.get() {
                        CheckoutState::Ready(path) => return Ok(path.clone()),
                        CheckoutState::Failed(error) => return Err(error.clone()),
                        CheckoutState::Pending(existing) => existing.clone(),
                    };
                    // register interest before releasing the shard lock
                    let notified = existing.notified();
                    drop(entry);
                    tracing::debug!(target: "git", "Waiting for checkout of {key}");
                    notified.await;
                }
                Entry::Vacant(entry) => {
                    entry.insert(CheckoutState::Pending(notify.clone()));
                    break;
                }
            }
        }

        let mut guard = PendingGuard {
            checkouts: &self.checkouts,
            key,
            notify,
            armed: true,
        };
        let result = self.create_checkout(locator).await;
        let state = match &result {
            Ok(path) => CheckoutState::Ready(path.clone()),
            Err(error) => CheckoutState::Failed(error.clone()),
        };
        guard.armed = false;
        self.checkouts.insert(guard.key.clone(), state);
        guard.notify.notify_waiters();
        result
    }

    async fn create_checkout(&self, locator: &RemoteLocator) -> Result<PathBuf, KustgraphError> {
        let target = self.checkout_dir(&locator.repository, &locator.revision);
        if tokio::fs::metadata(target.join(".git")).await.is_ok() {
            tracing::debug!(target: "git", "Reusing cached checkout {}", target.display());
            return Ok(target);
        }

        if which::which("git").is_err() {
            return Err(KustgraphError::GitNotFound);
        }

        tokio::fs::create_dir_all(&self.config.cache_dir).await?;
        let staging = tempfile::Builder::new().prefix(".checkout-").tempdir_in(&self.config.cache_dir)?;

        tracing::info!(
            target: "git",
            "Fetching {} at {}",
            locator.repository,
            locator.revision
        );

        run_git(staging.path(), &["init", "--quiet"], Duration::from_secs(30)).await?;

        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .take(CLONE_RETRIES);
        let fetch_args = fetch_args(locator);
        Retry::spawn(strategy, || run_git(staging.path(), &fetch_args, self.config.clone_timeout))
            .await?;

        run_git(staging.path(), &["checkout", "--quiet", "FETCH_HEAD"], Duration::from_secs(60)).await?;

        if let Err(e) = tokio::fs::rename(staging.path(), &target).await {
            // another process may have populated the cache first
            if tokio::fs::metadata(target.join(".git")).await.is_err() {
                return Err(KustgraphError::IoError(e));
            }
        }
        Ok(target)
    }
}

/// Clears a `Pending` entry if the creating task is dropped mid-checkout, so
/// waiters retry instead of hanging.
struct PendingGuard<'a> {
    checkouts: &'a DashMap<String, CheckoutState>,
    key: String,
    notify: Arc<Notify>,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.checkouts.remove(&self.key);
            self.notify.notify_waiters();
        }
    }
}

#[async_trait]
impl Fetcher for GitFetcher {
    async fn fetch(&self, identity: &NodeIdentity) -> Result<Vec<u8>, FetchError> {
        let NodeIdentity::Remote(locator) = identity else {
            return Err(FetchError::Failed(KustgraphError::Other {
                message: format!("git fetcher cannot read local identity {identity}"),
            }));
        };
        let checkout = self.ensure_checkout(locator).await?;
        if locator.path.is_empty() {
            return Err(FetchError::NotFound);
        }
        read_file(&checkout.join(&locator.path)).await
    }
}

fn checkout_key(repository: &str, revision: &str) -> String {
    format!("{repository}@{revision}")
}

/// Arguments of the shallow fetch; `--` keeps repository and revision from
/// being read as options.
fn fetch_args(locator: &RemoteLocator) -> [&str; 7] {
    [
        "fetch",
        "--quiet",
        "--depth",
        "1",
        "--",
        locator.repository.as_str(),
        locator.revision.as_str(),
    ]
}

async fn run_git(dir: &Path, args: &[&str], timeout: Duration) -> Result<(), KustgraphError> {
    let operation = args.first().copied().unwrap_or("git").to_string();
    tracing::debug!(target: "git", "Executing command: git -C {} {}", dir.display(), args.join(" "));

    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(KustgraphError::GitCommandError {
                operation,
                stderr: format!("timed out after {} seconds", timeout.as_secs()),
            });
        }
    };

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        tracing::debug!(target: "git", "Command failed with exit code {:?}: {}", output.status.code(), stderr);
        Err(KustgraphError::GitCommandError { operation, stderr })
    }
}
