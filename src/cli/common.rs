//! Shared plumbing for CLI commands: building the graph for an apps
//! directory, rendering identities, and writing output.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::{BuildOptions, CancellationToken, GraphBuilder};
use crate::config::KustgraphConfig;
use crate::core::NodeIdentity;
use crate::discovery::discover_overlays;
use crate::graph::Graph;
use crate::parser::YamlParser;
use crate::source::{GitFetcher, GitFetcherConfig, SourceFetcher};
use crate::utils::{absolute_path, relative_path, spinner_with_message, to_slash};

/// Options every command shares, resolved from flags and the config file.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Absolute, normalized apps directory.
    pub apps_dir: PathBuf,
    /// YAML output file (`-o`); console output when `None`.
    pub output: Option<PathBuf>,
    /// Whether to draw a spinner while building.
    pub show_progress: bool,
    pub config: KustgraphConfig,
}

impl GlobalOptions {
    /// Builds the dependency graph of every overlay under the apps directory.
    ///
    /// Ctrl-C cancels the build.
    pub async fn build_graph(&self) -> Result<Graph> {
        let roots = discover_overlays(&self.apps_dir)?;
        tracing::info!("Found {} overlays under {}", roots.len(), self.apps_dir.display());

        let fetcher = if self.config.remote.enabled {
            let mut git_config = GitFetcherConfig::new(self.config.cache_dir()?);
            git_config.clone_timeout = self.config.clone_timeout();
            SourceFetcher::with_git(GitFetcher::new(git_config))
        } else {
            SourceFetcher::local_only()
        };

        let cancel = CancellationToken::new();
        let options = BuildOptions::default()
            .with_max_parallel(self.config.max_parallel)
            .with_default_revision(self.config.default_revision.clone())
            .with_cancel(cancel.clone());
        let builder = GraphBuilder::new(Arc::new(fetcher), Arc::new(YamlParser), options);

        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let spinner = spinner_with_message(self.show_progress, "Building dependency graph...");
        let result = builder.build(&roots).await;
        spinner.finish_and_clear();
        interrupt.abort();

        Ok(result?)
    }

    /// Renders `identity` for output: relative to the apps directory when it
    /// lies below it, as-is otherwise.
    pub fn display(&self, identity: &NodeIdentity) -> String {
        display_relative(identity, &self.apps_dir)
    }
}

/// `identity` relative to `base` with forward slashes, or its full form when
/// it is remote or outside `base`.
pub fn display_relative(identity: &NodeIdentity, base: &Path) -> String {
    match identity.as_local_path() {
        Some(path) if path.starts_with(base) => to_slash(&relative_path(path, base)),
        _ => identity.to_string(),
    }
}

/// Resolves a user-supplied path against the working directory.
pub fn user_path(path: &Path) -> Result<PathBuf> {
    absolute_path(path).with_context(|| format!("Invalid path: {}", path.display()))
}

/// Writes `data` as a YAML document to `path`.
pub fn write_yaml<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize output")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote output to {}", path.display());
    Ok(())
}

/// Prints a header followed by `  - item` lines.
pub fn print_list(header: &str, items: &[String]) {
    println!("{header}");
    for item in items {
        println!("  - {item}");
    }
}

/// Prints `data` as pretty JSON.
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Console formats for the graph query commands.
pub const OUTPUT_FORMATS: [&str; 2] = ["text", "json"];

/// Rejects a `--format` value outside [`OUTPUT_FORMATS`].
pub fn validate_format(format: &str) -> Result<()> {
    if OUTPUT_FORMATS.contains(&format) {
        Ok(())
    } else {
        anyhow::bail!("Invalid format '{format}'. Valid formats are: {}", OUTPUT_FORMATS.join(", "))
    }
}

/// Emits `data` to the `-o` file as YAML, or to stdout as JSON. Returns
/// `false` when neither applies and the caller should print text.
pub fn emit_structured<T: Serialize>(global: &GlobalOptions, format: &str, data: &T) -> Result<bool> {
    if let Some(output) = &global.output {
        write_yaml(data, output)?;
        return Ok(true);
    }
    if format == "json" {
        print_json(data)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RemoteLocator;

    #[test]
    fn test_display_relative() {
        let base = Path::new("/repo/apps");
        assert_eq!(display_relative(&NodeIdentity::local("/repo/apps/web/base"), base), "web/base");
        assert_eq!(display_relative(&NodeIdentity::local("/repo/apps"), base), ".");
        assert_eq!(display_relative(&NodeIdentity::local("/repo/shared/x.yaml"), base), "/repo/shared/x.yaml");

        let remote = NodeIdentity::Remote(RemoteLocator {
            repository: "https://github.com/acme/platform".to_string(),
            revision: "v1".to_string(),
            path: "base".to_string(),
        });
        assert_eq!(display_relative(&remote, base), "https://github.com/acme/platform//base?ref=v1");
    }

    #[test]
    fn test_validate_format() {
        assert!(validate_format("text").is_ok());
        assert!(validate_format("json").is_ok());
        let err = validate_format("tree").unwrap_err();
        assert!(err.to_string().contains("Valid formats are: text, json"));
    }

    #[test]
    fn test_write_yaml() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out.yaml");
        let mut data = serde_yaml::Mapping::new();
        data.insert("root-apps".into(), vec!["a", "b"].into());
        write_yaml(&data, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "root-apps:\n- a\n- b\n");
    }
}
