//! Global constants used throughout the crate.
//!
//! File names, default settings, timeouts and retry parameters that more
//! than one module depends on.

use std::time::Duration;

/// Kustomization file names probed inside an overlay directory, in order.
/// The first one that exists wins.
pub const KUSTOMIZATION_FILE_NAMES: [&str; 3] =
    ["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// Extensions (lower-case, without dot) of files treated as manifests.
pub const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Revision used for remote references that do not name one.
pub const DEFAULT_REVISION: &str = "HEAD";

/// Hosts accepted in the scheme-less `host/org/repo` remote shorthand.
pub const SHORTHAND_GIT_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];

/// Default timeout for a shallow clone of a remote repository.
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum delay between retries of a failed clone.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// First delay between retries of a failed clone.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Number of retries for transient clone failures.
pub const CLONE_RETRIES: usize = 3;

/// Lower bound for the default build concurrency.
pub const MIN_PARALLELISM: usize = 10;

/// Default concurrency is this many loads per CPU core.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Core count assumed when the platform cannot report one.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Default build concurrency: `max(10, 2 × cores)`.
#[must_use]
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(FALLBACK_CORE_COUNT);
    std::cmp::max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)
}
