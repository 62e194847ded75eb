//! Shared helpers: lexical path handling and terminal progress.
//!
//! - [`paths`] - path normalization and relative rendering
//! - [`progress`] - spinner used by the CLI while building

pub mod paths;
pub mod progress;

pub use paths::{absolute_path, normalize_path, normalize_repo_path, relative_path, to_slash};
pub use progress::{ProgressBar, spinner_with_message};
