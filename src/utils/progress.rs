//! Spinner shown while a graph is being built.
//!
//! Progress output goes to stderr so it never mixes with command output. It is
//! hidden when the user passes `--no-progress`/`--quiet` or sets
//! `KUSTGRAPH_NO_PROGRESS`.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

fn is_progress_disabled() -> bool {
    std::env::var("KUSTGRAPH_NO_PROGRESS").is_ok()
}

/// Thin wrapper over an `indicatif` spinner with the crate's styling.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates an animated spinner, or a hidden one when progress is disabled
    /// through the environment.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            if let Ok(style) = spinner_style() {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { inner: bar }
    }

    /// Creates a spinner that draws nothing.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Returns `true` if the spinner draws nothing.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn spinner_style() -> Result<IndicatifStyle, indicatif::style::TemplateError> {
    Ok(IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")?
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
}

/// Creates a spinner with an initial message, honouring `enabled`.
pub fn spinner_with_message(enabled: bool, msg: impl Into<String>) -> ProgressBar {
    let spinner = if enabled {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    spinner.set_message(msg);
    spinner
}
