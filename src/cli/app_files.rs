//! List every file an application is assembled from.
//!
//! The application may be given as its directory or as its kustomization
//! file. Paths are printed relative to the application directory.

use anyhow::{Result, bail};
use clap::Args;
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

use super::common::{GlobalOptions, display_relative, print_list, user_path, write_yaml};
use crate::core::KustgraphError;
use crate::discovery::overlay_identity;
use crate::query::QueryEngine;

/// Command to list the files used by one application.
#[derive(Args, Debug)]
pub struct AppFilesCommand {
    /// Application directory or its kustomization file
    #[arg(value_name = "APP_PATH")]
    app: PathBuf,
}

impl AppFilesCommand {
    pub async fn execute(self, global: &GlobalOptions) -> Result<()> {
        let absolute = user_path(&self.app)?;
        if !absolute.exists() {
            bail!("Invalid <app-path> (path does not exist): {}", absolute.display());
        }
        let app = overlay_identity(&absolute)?;

        let graph = global.build_graph().await?;
        let engine = QueryEngine::new(&graph);
        let files = engine.overlay_files(&app).map_err(|e| match e {
            KustgraphError::UnknownNode { .. } => KustgraphError::NotAnOverlay { identity: app.clone() },
            other => other,
        })?;

        let app_dir = app.as_local_path().map(PathBuf::from).unwrap_or_default();
        let mut paths: Vec<String> = files
            .iter()
            .map(|file| {
                if file.as_local_path().is_some_and(|p| p.starts_with(&app_dir)) {
                    display_relative(file, &app_dir)
                } else {
                    global.display(file)
                }
            })
            .collect();
        paths.sort();

        let key = match global.display(&app).as_str() {
            "." => app.file_name().unwrap_or_default().to_string(),
            other => other.to_string(),
        };

        if let Some(output) = &global.output {
            let mut by_app = Mapping::new();
            by_app.insert(key.into(), Value::from(paths));
            let mut yaml = Mapping::new();
            yaml.insert("app-files".into(), Value::Mapping(by_app));
            return write_yaml(&yaml, output);
        }

        print_list(&format!("Files used by application '{key}':"), &paths);
        Ok(())
    }
}
