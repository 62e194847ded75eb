//! List the root applications of an apps directory.
//!
//! A root application is an overlay that no other overlay references. These
//! are the units that get deployed; everything else is a building block.
//!
//! # Examples
//!
//! ```bash
//! kustgraph -a apps list-root-apps
//! kustgraph -a apps -o roots.yaml list-root-apps
//! ```

use anyhow::Result;
use clap::Args;
use serde_yaml::{Mapping, Value};

use super::common::{GlobalOptions, print_list, write_yaml};
use crate::query::QueryEngine;

/// Command to list root applications.
#[derive(Args, Debug, Default)]
pub struct ListRootAppsCommand {}

impl ListRootAppsCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let graph = global.build_graph().await?;
        let engine = QueryEngine::new(&graph);

        let mut apps: Vec<String> = engine.root_overlays().iter().map(|id| global.display(id)).collect();
        apps.sort();

        if let Some(output) = &global.output {
            let mut yaml = Mapping::new();
            yaml.insert("root-apps".into(), Value::from(apps));
            return write_yaml(&yaml, output);
        }

        if apps.is_empty() {
            println!("No root applications found in: {}", global.apps_dir.display());
        } else {
            print_list("Root Applications:", &apps);
        }
        Ok(())
    }
}
