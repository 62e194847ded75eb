//! Common test utilities for kustgraph integration tests
//!
//! [`TestApps`] owns a temporary repository with an `apps/` directory,
//! writes kustomizations into it, and runs either the library build or the
//! `kustgraph` binary against it.

// Not every helper is used by every test file
#![allow(dead_code)]

use anyhow::{Context, Result};
use kustgraph_cli::builder::{BuildOptions, GraphBuilder};
use kustgraph_cli::core::{KustgraphError, NodeIdentity};
use kustgraph_cli::discovery::discover_overlays;
use kustgraph_cli::graph::Graph;
use kustgraph_cli::parser::YamlParser;
use kustgraph_cli::source::SourceFetcher;
use kustgraph_cli::test_utils::{KustomizationFixture, OverlayTree, manifest};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// A repository with an `apps/` directory in a temp dir.
pub struct TestApps {
    tree: OverlayTree,
}

impl TestApps {
    pub fn new() -> Result<Self> {
        let tree = OverlayTree::new()?;
        std::fs::create_dir_all(tree.path("apps"))?;
        Ok(Self { tree })
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.tree.path("apps")
    }

    /// Absolute path of `rel` (relative to the repository root).
    pub fn path(&self, rel: &str) -> PathBuf {
        self.tree.path(rel)
    }

    pub fn id(&self, rel: &str) -> NodeIdentity {
        NodeIdentity::local(self.tree.path(rel))
    }

    pub fn kustomization(&self, dir: &str, fixture: KustomizationFixture) -> Result<()> {
        self.tree.kustomization(dir, &fixture)?;
        Ok(())
    }

    /// Writes a raw kustomization document.
    pub fn raw_kustomization(&self, dir: &str, content: &str) -> Result<()> {
        self.tree.write(&format!("{dir}/kustomization.yaml"), content)?;
        Ok(())
    }

    /// Writes a minimal manifest named after the file.
    pub fn manifest(&self, rel: &str, kind: &str) -> Result<()> {
        let name = Path::new(rel)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("resource");
        self.tree.write(rel, &manifest(kind, name))?;
        Ok(())
    }

    pub fn write(&self, rel: &str, content: &str) -> Result<()> {
        self.tree.write(rel, content)?;
        Ok(())
    }

    /// A web application with a base and two environments:
    ///
    /// ```text
    /// apps/web/base            resources: deployment.yaml, service.yaml
    /// apps/web/overlays/prod   bases: ../../base, patches: replicas.yaml
    /// apps/web/overlays/staging  resources: ../../base, configMapGenerator: app.env
    /// ```
    pub fn web_app(&self) -> Result<()> {
        self.kustomization(
            "apps/web/base",
            KustomizationFixture::new().resource("deployment.yaml").resource("service.yaml"),
        )?;
        self.manifest("apps/web/base/deployment.yaml", "Deployment")?;
        self.manifest("apps/web/base/service.yaml", "Service")?;

        self.kustomization(
            "apps/web/overlays/prod",
            KustomizationFixture::new().base("../../base").patch("replicas.yaml"),
        )?;
        self.write(
            "apps/web/overlays/prod/replicas.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: deployment\nspec:\n  replicas: 3\n",
        )?;

        self.kustomization(
            "apps/web/overlays/staging",
            KustomizationFixture::new().resource("../../base").generator_file("app.env"),
        )?;
        self.write("apps/web/overlays/staging/app.env", "LOG_LEVEL=debug\n")?;
        Ok(())
    }

    /// Builds the graph of every overlay under `apps/` with local retrieval.
    pub async fn build(&self) -> Result<Graph, KustgraphError> {
        let roots = discover_overlays(&self.apps_dir())?;
        self.build_from(&roots).await
    }

    pub async fn build_from(&self, roots: &[NodeIdentity]) -> Result<Graph, KustgraphError> {
        let builder = GraphBuilder::new(
            Arc::new(SourceFetcher::local_only()),
            Arc::new(YamlParser),
            BuildOptions::default().with_max_parallel(4),
        );
        builder.build(roots).await
    }

    /// Runs `kustgraph -a <apps> --no-progress <args>` from the repository
    /// root with an isolated configuration.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self
            .command(args)
            .output()
            .context("Failed to run kustgraph")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_kustgraph"));
        command
            .arg("-a")
            .arg(self.apps_dir())
            .arg("--no-progress")
            .arg("--no-remote")
            .args(args)
            .current_dir(self.root())
            .env("KUSTGRAPH_CONFIG", self.path("kustgraph.toml"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        command
    }
}

/// Captured output of a `kustgraph` run.
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "Command failed with code {:?}\nStderr: {}",
            self.code, self.stderr
        );
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "Command unexpectedly succeeded\nStdout: {}", self.stdout);
        assert_eq!(self.code, Some(1));
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{text}'\nActual stdout: {}",
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{text}'\nActual stderr: {}",
            self.stderr
        );
        self
    }

    /// Non-empty stdout lines.
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().filter(|l| !l.trim().is_empty()).collect()
    }
}
