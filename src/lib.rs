//! kustgraph - dependency graph engine for Kustomize-style overlay repositories
//!
//! A Kustomize repository is a forest of directories. Each directory holds a
//! kustomization file that pulls in bases, components, manifests, patches and
//! generator inputs, either from the same repository or from remote Git
//! repositories. kustgraph loads those declarations, builds the full
//! dependency graph, and answers questions about it:
//!
//! - which overlays are deployable roots
//! - which roots are affected when a file changes
//! - which files make up an application
//! - in what order bases and components are layered
//!
//! # Architecture Overview
//!
//! A build flows through the modules in this order:
//!
//! 1. [`discovery`] finds the overlays under an apps directory (the roots).
//! 2. [`builder`] walks the declarations depth-first from each root. For every
//!    declared reference it asks [`reference`] for the canonical
//!    [`core::NodeIdentity`] of the target.
//! 3. [`loader`] retrieves each identity exactly once through a
//!    [`source::Fetcher`] (local files, or shallow Git checkouts for remote
//!    references). It parses the content with a [`parser::DocumentParser`]
//!    and classifies the node.
//! 4. The result is an immutable [`graph::Graph`]. [`query`] answers
//!    ancestor, descendant, path and ordering questions over it.
//!
//! Errors carry the reference and the chain of nodes that led to them (see
//! [`core::KustgraphError`]). A build can be cancelled or given a deadline
//! through [`builder::BuildOptions`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kustgraph_cli::builder::{BuildOptions, GraphBuilder};
//! use kustgraph_cli::discovery::discover_overlays;
//! use kustgraph_cli::parser::YamlParser;
//! use kustgraph_cli::query::QueryEngine;
//! use kustgraph_cli::source::SourceFetcher;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let roots = discover_overlays("apps".as_ref())?;
//! let builder = GraphBuilder::new(
//!     Arc::new(SourceFetcher::local_only()),
//!     Arc::new(YamlParser),
//!     BuildOptions::default(),
//! );
//! let graph = builder.build(&roots).await?;
//!
//! for root in QueryEngine::new(&graph).root_overlays() {
//!     println!("{root}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod discovery;
pub mod graph;
pub mod loader;
pub mod parser;
pub mod query;
pub mod reference;
pub mod source;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
