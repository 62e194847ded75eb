//! Show what a node depends on, or what depends on it.
//!
//! # Examples
//!
//! ```bash
//! # Everything the prod overlay pulls in
//! kustgraph -a apps deps apps/web/overlays/prod
//!
//! # Overlays that extend the base, through bases and components only
//! kustgraph -a apps deps apps/web/base --reverse --types base,component
//! ```

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{GlobalOptions, emit_structured, user_path, validate_format};
use crate::core::ReferenceType;
use crate::discovery::overlay_identity;
use crate::query::QueryEngine;

/// Command to list the descendants or ancestors of a node.
#[derive(Args, Debug)]
pub struct DepsCommand {
    /// Overlay directory, kustomization file or leaf file
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// List the nodes that reference PATH instead of those it references
    #[arg(short, long)]
    reverse: bool,

    /// Only follow edges of these types (base, resource, component, patch, generator)
    #[arg(short, long, value_delimiter = ',', value_name = "TYPES")]
    types: Vec<ReferenceType>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Debug, Serialize)]
struct DepsReport {
    node: String,
    direction: &'static str,
    direct: Vec<String>,
    transitive: Vec<String>,
}

impl DepsCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        validate_format(&self.format)?;
        let node = overlay_identity(&user_path(&self.path)?)?;
        let types = self.edge_types();

        let graph = global.build_graph().await?;
        let engine = QueryEngine::new(&graph);
        let related = if self.reverse {
            engine.ancestors(&node, &types)?
        } else {
            engine.descendants(&node, &types)?
        };

        let report = DepsReport {
            node: global.display(&node),
            direction: if self.reverse { "dependents" } else { "dependencies" },
            direct: related.direct.iter().map(|id| global.display(id)).collect(),
            transitive: related.transitive.iter().map(|id| global.display(id)).collect(),
        };
        if emit_structured(global, &self.format, &report)? {
            return Ok(());
        }

        let title = if self.reverse { "Dependents" } else { "Dependencies" };
        println!("{title} of '{}':", report.node);
        if report.direct.is_empty() && report.transitive.is_empty() {
            println!("  (none)");
            return Ok(());
        }
        for (label, entries) in [("Direct", &report.direct), ("Transitive", &report.transitive)] {
            if entries.is_empty() {
                continue;
            }
            println!("  {label}:");
            for entry in entries {
                println!("    - {entry}");
            }
        }
        Ok(())
    }

    /// `--types`, or every type when the flag is absent.
    fn edge_types(&self) -> Vec<ReferenceType> {
        if self.types.is_empty() {
            ReferenceType::ALL.to_vec()
        } else {
            self.types.clone()
        }
    }
}
