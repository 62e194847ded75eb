//! Command-line interface for kustgraph.
//!
//! Every command builds the dependency graph of the overlays found under
//! `--apps-dir` and answers one question about it:
//!
//! - `list-root-apps` - overlays no other overlay references
//! - `affected-apps` - root applications that use any of the given files
//! - `app-files` - every file an application is assembled from
//! - `order` - the order in which an application's bases and components apply
//! - `paths` - every reference chain between two nodes
//! - `deps` - what a node references, or what references it
//!
//! # Global options
//!
//! `-a/--apps-dir` is required and goes before the subcommand. The remaining
//! global flags may appear anywhere:
//!
//! ```bash
//! kustgraph -a apps list-root-apps --no-progress
//! kustgraph -a apps -o affected.yaml affected-apps -f changed.txt
//! kustgraph -a apps --no-remote --max-parallel 4 deps apps/web/base --reverse
//! ```
//!
//! Flags override the configuration file (see [`crate::config`]), which in
//! turn overrides the built-in defaults.

mod affected_apps;
mod app_files;
mod common;
mod deps;
mod list_root_apps;
mod order;
mod paths;


pub use common::GlobalOptions;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::KustgraphConfig;
use common::user_path;

/// Logging and UI settings derived from the command line.
///
/// Kept separate from [`Cli`] so tests can check the flag translation without
/// installing a global subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default level when `RUST_LOG` is not set.
    pub log_level: String,
    /// Log to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    pub no_progress: bool,
}

impl CliConfig {
    /// Installs the global tracing subscriber.
    ///
    /// `RUST_LOG` wins over `log_level`. A subscriber that is already
    /// installed (as in tests) is left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened.
    pub fn init_logging(&self) -> Result<()> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

        let installed = match &self.log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?;
                builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
            }
            None => builder.with_writer(std::io::stderr).try_init(),
        };
        if installed.is_err() {
            tracing::debug!("Tracing subscriber already installed");
        }
        Ok(())
    }
}

/// Dependency graph queries for kustomize overlays.
#[derive(Parser, Debug)]
#[command(
    name = "kustgraph",
    about = "Analyze dependencies between kustomize overlays",
    version,
    long_about = "kustgraph builds the dependency graph of every kustomization under an apps directory and answers \
                  questions about it: which applications are roots, which are affected by a change, and which files \
                  an application uses."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing the applications
    #[arg(short, long, value_name = "DIR")]
    apps_dir: PathBuf,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Write results as YAML to this file instead of the console
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of concurrent retrievals
    #[arg(long, global = true, value_name = "N")]
    max_parallel: Option<usize>,

    /// Revision used for remote references without `?ref=`
    #[arg(long, global = true, value_name = "REV")]
    default_revision: Option<String>,

    /// Do not clone remote references; keep them as opaque nodes
    #[arg(long, global = true)]
    no_remote: bool,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List applications that no other application references
    ListRootApps(list_root_apps::ListRootAppsCommand),

    /// List root applications affected by modified files
    AffectedApps(affected_apps::AffectedAppsCommand),

    /// List the files used by an application
    AppFiles(app_files::AppFilesCommand),

    /// Show the order in which an application's bases and components apply
    Order(order::OrderCommand),

    /// Show every reference chain between two nodes
    Paths(paths::PathsCommand),

    /// Show what a node references, or what references it
    Deps(deps::DepsCommand),
}

impl Cli {
    /// Runs the selected command.
    pub async fn execute(self) -> Result<()> {
        let cli_config = self.build_config();
        cli_config.init_logging()?;

        let config = self.load_config().await?;
        let global = GlobalOptions {
            apps_dir: user_path(&self.apps_dir)?,
            output: self.output.clone(),
            show_progress: !cli_config.no_progress,
            config,
        };
        tracing::debug!("Apps directory: {}", global.apps_dir.display());

        match self.command {
            Commands::ListRootApps(cmd) => cmd.execute(&global).await,
            Commands::AffectedApps(cmd) => cmd.execute(&global).await,
            Commands::AppFiles(cmd) => cmd.execute(&global).await,
            Commands::Order(cmd) => cmd.execute(&global).await,
            Commands::Paths(cmd) => cmd.execute(&global).await,
            Commands::Deps(cmd) => cmd.execute(&global).await,
        }
    }

    /// Translates verbosity and UI flags.
    ///
    /// `--verbose` logs at `debug`, `--quiet` at `error`, otherwise `warn`.
    /// `--quiet` also hides the spinner.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            log_file: self.log_file.clone(),
            no_progress: self.no_progress || self.quiet,
        }
    }

    /// Loads the configuration file and applies command-line overrides.
    async fn load_config(&self) -> Result<KustgraphConfig> {
        let mut config = KustgraphConfig::load_with_optional(self.config.clone()).await?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut KustgraphConfig) {
        if let Some(max_parallel) = self.max_parallel {
            config.max_parallel = max_parallel;
        }
        if let Some(revision) = &self.default_revision {
            config.default_revision.clone_from(revision);
        }
        if self.no_remote {
            config.remote.enabled = false;
        }
    }
}
