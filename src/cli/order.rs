//! Show the order in which an application's bases and components apply.
//!
//! Bases and components farther from the application come first, so every
//! entry precedes the overlays built on top of it.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{GlobalOptions, emit_structured, user_path, validate_format};
use crate::discovery::overlay_identity;
use crate::query::QueryEngine;

/// Command to print the application order of an overlay.
#[derive(Args, Debug)]
pub struct OrderCommand {
    /// Application directory or its kustomization file
    #[arg(value_name = "APP_PATH")]
    app: PathBuf,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Debug, Serialize)]
struct OrderReport {
    overlay: String,
    order: Vec<String>,
}

impl OrderCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        validate_format(&self.format)?;
        let app = overlay_identity(&user_path(&self.app)?)?;

        let graph = global.build_graph().await?;
        let order = QueryEngine::new(&graph).application_order(&app)?;

        let report = OrderReport {
            overlay: global.display(&app),
            order: order.iter().map(|id| global.display(id)).collect(),
        };
        if emit_structured(global, &self.format, &report)? {
            return Ok(());
        }

        println!("Application order for '{}':", report.overlay);
        for (position, entry) in report.order.iter().enumerate() {
            println!("  {}. {entry}", position + 1);
        }
        Ok(())
    }
}
