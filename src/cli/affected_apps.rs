//! Find the applications affected by a set of changed files.
//!
//! Typical use is in CI: feed the files touched by a change and redeploy
//! only the root applications that consume them.
//!
//! ```bash
//! kustgraph -a apps affected-apps apps/base/deployment.yaml
//! git diff --name-only main | kustgraph -a apps affected-apps -f /dev/stdin
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use super::common::{GlobalOptions, user_path, write_yaml};
use crate::core::{KustgraphError, NodeIdentity};
use crate::discovery::overlay_identity;
use crate::query::QueryEngine;
use crate::utils::to_slash;

/// Command to list the root applications that use given files.
#[derive(Args, Debug, Default)]
pub struct AffectedAppsCommand {
    /// Modified file paths
    #[arg(value_name = "MODIFIED_FILE")]
    files: Vec<PathBuf>,

    /// Read modified file paths from this file, one per line
    #[arg(short = 'f', long, value_name = "FILE")]
    files_from_file: Option<PathBuf>,
}

/// Result for one modified file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Affected {
    Apps(Vec<String>),
    Unreferenced(PathBuf),
}

impl AffectedAppsCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let files = self.collect_files().await?;

        if files.is_empty() {
            if let Some(output) = &global.output {
                let mut yaml = Mapping::new();
                yaml.insert("affected-apps".into(), Value::Mapping(Mapping::new()));
                return write_yaml(&yaml, output);
            }
            println!("Affected Applications:");
            println!("  No modified files provided to check.");
            return Ok(());
        }

        let graph = global.build_graph().await?;
        let engine = QueryEngine::new(&graph);

        let mut results: Vec<(String, Affected)> = Vec::with_capacity(files.len());
        for file in &files {
            let absolute = user_path(file)?;
            let key = if absolute.starts_with(&global.apps_dir) {
                global.display(&NodeIdentity::local(&absolute))
            } else {
                to_slash_keep_root(file)
            };

            // a changed kustomization file stands for its overlay
            let affected = match engine.affected_roots(&overlay_identity(&absolute)?) {
                Ok(roots) => {
                    let mut apps: Vec<String> = roots.iter().map(|id| global.display(id)).collect();
                    apps.sort();
                    Affected::Apps(apps)
                }
                Err(KustgraphError::UnknownNode { .. }) => {
                    tracing::debug!("{} is not part of the graph", absolute.display());
                    Affected::Unreferenced(absolute.clone())
                }
                Err(e) => return Err(e.into()),
            };
            results.push((key, affected));
        }

        if let Some(output) = &global.output {
            let mut by_file = Mapping::new();
            for (key, affected) in results {
                let apps = match affected {
                    Affected::Apps(apps) => apps,
                    Affected::Unreferenced(_) => Vec::new(),
                };
                by_file.insert(key.into(), Value::from(apps));
            }
            let mut yaml = Mapping::new();
            yaml.insert("affected-apps".into(), Value::Mapping(by_file));
            return write_yaml(&yaml, output);
        }

        println!("Affected Applications:");
        let mut any_affected = false;
        for (key, affected) in &results {
            println!("Affected apps by {key}:");
            match affected {
                Affected::Apps(apps) if apps.is_empty() => println!("  - None"),
                Affected::Apps(apps) => {
                    any_affected = true;
                    for app in apps {
                        println!("  - {app}");
                    }
                }
                Affected::Unreferenced(path) => {
                    println!("  Warning: File with path {} is not referenced by any app", path.display());
                }
            }
        }
        if !any_affected {
            println!("Summary: No applications were found to be affected by the specified file(s).");
        }
        Ok(())
    }

    /// Positional files followed by those listed in `--files-from-file`.
    async fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.files.clone();
        if let Some(list) = &self.files_from_file {
            let content = tokio::fs::read_to_string(list)
                .await
                .with_context(|| format!("File specified by --files-from-file not found: {}", list.display()))?;
            files.extend(parse_file_list(&content));
        }
        Ok(files)
    }
}

/// One path per line; blank lines and `#` comments are skipped.
fn parse_file_list(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

/// Forward-slash rendering that keeps a leading `/` for absolute paths.
fn to_slash_keep_root(path: &Path) -> String {
    let rendered = to_slash(path);
    if path.has_root() {
        format!("/{rendered}")
    } else {
        rendered
    }
}
