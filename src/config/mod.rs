//! User configuration.
//!
//! kustgraph reads an optional TOML file. Every key has a default, so a
//! missing file or an empty one is a valid configuration:
//!
//! ```toml
//! # ~/.kustgraph/config.toml
//! default_revision = "main"
//! max_parallel = 16
//!
//! [remote]
//! enabled = true
//! cache_dir = "~/.cache/kustgraph/repos"
//! clone_timeout_secs = 120
//! ```
//!
//! The file is looked up in this order:
//!
//! 1. the `--config <path>` flag
//! 2. the `KUSTGRAPH_CONFIG` environment variable
//! 3. `~/.kustgraph/config.toml` (`%LOCALAPPDATA%\kustgraph\config.toml` on Windows)
//!
//! Command-line flags such as `--max-parallel` override values from the file;
//! see [`crate::cli`].

use crate::constants::{DEFAULT_REVISION, GIT_CLONE_TIMEOUT, default_max_parallel};
use crate::core::KustgraphError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "KUSTGRAPH_CONFIG";

fn default_revision() -> String {
    DEFAULT_REVISION.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_clone_timeout_secs() -> u64 {
    GIT_CLONE_TIMEOUT.as_secs()
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KustgraphConfig {
    /// Revision for remote references without `?ref=`.
    #[serde(default = "default_revision")]
    pub default_revision: String,

    /// Upper bound on concurrent retrievals during a build.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Remote reference handling.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// When `false`, remote overlays are kept as opaque nodes and never
    /// cloned.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Where shallow checkouts are cached. `~` and `$VARS` are expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,
}

impl Default for KustgraphConfig {
    fn default() -> Self {
        Self {
            default_revision: default_revision(),
            max_parallel: default_max_parallel(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
            clone_timeout_secs: default_clone_timeout_secs(),
        }
    }
}

impl KustgraphConfig {
    /// Loads the configuration from `explicit`, `KUSTGRAPH_CONFIG` or the
    /// default location, in that order. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if it holds invalid values (see [`validate`](Self::validate)).
    pub async fn load_with_optional(explicit: Option<PathBuf>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => Self::config_path()?,
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Loads and validates the configuration stored at `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `KUSTGRAPH_CONFIG` if set, otherwise [`default_path`](Self::default_path).
    pub fn config_path() -> Result<PathBuf> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::default_path(),
        }
    }

    /// Platform-specific default location of the config file.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("kustgraph")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".kustgraph")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Rejects values no build can run with.
    pub fn validate(&self) -> Result<(), KustgraphError> {
        if self.max_parallel == 0 {
            return Err(KustgraphError::ConfigError {
                message: "max_parallel must be at least 1".to_string(),
            });
        }
        if self.default_revision.trim().is_empty() {
            return Err(KustgraphError::ConfigError {
                message: "default_revision must not be empty".to_string(),
            });
        }
        if self.default_revision.starts_with('-') {
            return Err(KustgraphError::ConfigError {
                message: "default_revision must not start with '-'".to_string(),
            });
        }
        if self.remote.clone_timeout_secs == 0 {
            return Err(KustgraphError::ConfigError {
                message: "remote.clone_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Directory for remote checkouts, with `~` and environment variables
    /// expanded.
    pub fn cache_dir(&self) -> Result<PathBuf, KustgraphError> {
        match &self.remote.cache_dir {
            Some(dir) => shellexpand::full(dir)
                .map(|expanded| PathBuf::from(expanded.as_ref()))
                .map_err(|e| KustgraphError::ConfigError {
                    message: format!("Cannot expand remote.cache_dir '{dir}': {e}"),
                }),
            None => dirs::cache_dir()
                .map(|dir| dir.join("kustgraph").join("repos"))
                .ok_or_else(|| KustgraphError::ConfigError {
                    message: "Unable to determine a cache directory; set remote.cache_dir".to_string(),
                }),
        }
    }

    pub const fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.clone_timeout_secs)
    }
}
