//! Integration test suite for kustgraph
//!
//! End-to-end tests that write overlay trees into temporary directories and
//! run graph builds, queries, and the `kustgraph` binary against them.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **build**: graph construction, diamonds, cycles, missing targets
//! - **concurrency**: single-flight retrieval, parallelism bound, cancellation
//! - **queries**: ancestors, descendants, paths, ordering, root detection
//! - **cli**: command output in text, JSON and YAML form

#[path = "../common/mod.rs"]
mod common;

mod build;
mod cli;
mod concurrency;
mod queries;
