//! In-memory [`Fetcher`] that counts every retrieval.

use crate::core::{NodeIdentity, RemoteLocator};
use crate::source::{FetchError, Fetcher};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves files from a map and records how often each identity was asked
/// for. An optional delay makes concurrent requests overlap.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    files: HashMap<NodeIdentity, Vec<u8>>,
    counts: DashMap<NodeIdentity, usize>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a local file at the absolute `path`.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(NodeIdentity::local(path), content.as_bytes().to_vec());
        self
    }

    /// Adds a file inside a remote repository.
    pub fn with_remote_file(mut self, repository: &str, revision: &str, path: &str, content: &str) -> Self {
        let identity = NodeIdentity::Remote(RemoteLocator {
            repository: repository.to_string(),
            revision: revision.to_string(),
            path: path.to_string(),
        });
        self.files.insert(identity, content.as_bytes().to_vec());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `identity` was fetched.
    pub fn fetch_count(&self, identity: &NodeIdentity) -> usize {
        self.counts.get(identity).map_or(0, |count| *count)
    }

    pub fn total_fetches(&self) -> usize {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, identity: &NodeIdentity) -> Result<Vec<u8>, FetchError> {
        *self.counts.entry(identity.clone()).or_insert(0) += 1;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.files.get(identity).cloned().ok_or(FetchError::NotFound)
    }
}
