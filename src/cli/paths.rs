//! Show every reference chain that leads from one node to another.
//!
//! Useful for answering "why does this overlay pull in that file?".

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{GlobalOptions, emit_structured, user_path, validate_format};
use crate::discovery::overlay_identity;
use crate::query::QueryEngine;

/// Command to list all simple paths between two nodes.
#[derive(Args, Debug)]
pub struct PathsCommand {
    /// Starting overlay or file
    #[arg(value_name = "FROM")]
    from: PathBuf,

    /// Target overlay or file
    #[arg(value_name = "TO")]
    to: PathBuf,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Debug, Serialize)]
struct PathsReport {
    from: String,
    to: String,
    paths: Vec<Vec<String>>,
}

impl PathsCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        validate_format(&self.format)?;
        let from = overlay_identity(&user_path(&self.from)?)?;
        let to = overlay_identity(&user_path(&self.to)?)?;

        let graph = global.build_graph().await?;
        let paths = QueryEngine::new(&graph).paths_between(&from, &to)?;

        let report = PathsReport {
            from: global.display(&from),
            to: global.display(&to),
            paths: paths
                .iter()
                .map(|path| path.iter().map(|id| global.display(id)).collect())
                .collect(),
        };
        if emit_structured(global, &self.format, &report)? {
            return Ok(());
        }

        if report.paths.is_empty() {
            println!("No path from '{}' to '{}'", report.from, report.to);
            return Ok(());
        }
        println!("Paths from '{}' to '{}':", report.from, report.to);
        for path in &report.paths {
            println!("  {}", path.join(" -> "));
        }
        Ok(())
    }
}
