//! Fixtures for overlay trees
//!
//! [`KustomizationFixture`] renders a kustomization document from a few
//! builder calls; [`OverlayTree`] writes files into a temporary directory.

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for kustomization documents.
#[derive(Clone, Debug, Default)]
pub struct KustomizationFixture {
    bases: Vec<String>,
    resources: Vec<String>,
    components: Vec<String>,
    patches: Vec<String>,
    generator_files: Vec<String>,
}

impl KustomizationFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, reference: &str) -> Self {
        self.bases.push(reference.to_string());
        self
    }

    pub fn resource(mut self, reference: &str) -> Self {
        self.resources.push(reference.to_string());
        self
    }

    pub fn component(mut self, reference: &str) -> Self {
        self.components.push(reference.to_string());
        self
    }

    /// Adds a `patches` entry with a `path`
    pub fn patch(mut self, path: &str) -> Self {
        self.patches.push(path.to_string());
        self
    }

    /// Adds a file to a single `configMapGenerator` entry
    pub fn generator_file(mut self, path: &str) -> Self {
        self.generator_files.push(path.to_string());
        self
    }

    /// Renders the document as YAML.
    pub fn to_yaml(&self) -> String {
        let mut doc = Mapping::new();
        doc.insert("apiVersion".into(), "kustomize.config.k8s.io/v1beta1".into());
        doc.insert("kind".into(), "Kustomization".into());

        for (field, entries) in [
            ("bases", &self.bases),
            ("resources", &self.resources),
            ("components", &self.components),
        ] {
            if !entries.is_empty() {
                doc.insert(field.into(), string_list(entries));
            }
        }

        if !self.patches.is_empty() {
            let patches = self
                .patches
                .iter()
                .map(|path| {
                    let mut entry = Mapping::new();
                    entry.insert("path".into(), path.as_str().into());
                    Value::Mapping(entry)
                })
                .collect();
            doc.insert("patches".into(), Value::Sequence(patches));
        }

        if !self.generator_files.is_empty() {
            let mut generator = Mapping::new();
            generator.insert("name".into(), "generated".into());
            generator.insert("files".into(), string_list(&self.generator_files));
            doc.insert(
                "configMapGenerator".into(),
                Value::Sequence(vec![Value::Mapping(generator)]),
            );
        }

        serde_yaml::to_string(&doc).unwrap_or_default()
    }
}

fn string_list(entries: &[String]) -> Value {
    Value::Sequence(entries.iter().map(|e| Value::String(e.clone())).collect())
}

/// A minimal Kubernetes manifest for resource files.
pub fn manifest(kind: &str, name: &str) -> String {
    format!("apiVersion: v1\nkind: {kind}\nmetadata:\n  name: {name}\n")
}

/// Temporary directory holding an overlay tree.
pub struct OverlayTree {
    temp_dir: TempDir,
    root: PathBuf,
}

impl OverlayTree {
    /// Creates an empty tree.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let root = crate::utils::absolute_path(temp_dir.path())?;
        Ok(Self { temp_dir, root })
    }

    /// Absolute, normalized root of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Writes `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Writes `dir/kustomization.yaml`.
    pub fn kustomization(&self, dir: &str, fixture: &KustomizationFixture) -> Result<PathBuf> {
        let rel = if dir.is_empty() || dir == "." {
            "kustomization.yaml".to_string()
        } else {
            format!("{dir}/kustomization.yaml")
        };
        self.write(&rel, &fixture.to_yaml())
    }

    /// Keeps the directory alive for the lifetime of the tree.
    pub fn temp_dir(&self) -> &TempDir {
        &self.temp_dir
    }
}
