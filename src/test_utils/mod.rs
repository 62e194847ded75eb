//! Test utilities for kustgraph
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite:
//!
//! - [`init_test_logging`] - install a test-friendly tracing subscriber once
//! - [`MemoryFetcher`] - in-memory retrieval with per-identity fetch counts
//! - [`KustomizationFixture`] and [`OverlayTree`] - overlay trees on disk
//!
//! # Example
//!
//! ```rust,no_run
//! use kustgraph_cli::test_utils::{KustomizationFixture, OverlayTree};
//!
//! let tree = OverlayTree::new().unwrap();
//! tree.kustomization("base", &KustomizationFixture::new().resource("deploy.yaml")).unwrap();
//! tree.kustomization("prod", &KustomizationFixture::new().base("../base")).unwrap();
//! ```

pub mod fetcher;
pub mod fixtures;

pub use fetcher::MemoryFetcher;
pub use fixtures::{KustomizationFixture, OverlayTree, manifest};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=kustgraph_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
