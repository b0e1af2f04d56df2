// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Compose command - turn a build request into a manifest

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use tracing::info;

use super::load_request;
use crate::errors::ComposeError;

/// Run the compose command
///
/// The manifest goes to stdout unless `out` is given; everything else is
/// written to stderr.
pub async fn run(
    request_path: PathBuf,
    out: Option<PathBuf>,
    output: Option<String>,
    compact: bool,
    verbose: bool,
) -> Result<()> {
    let mut request = load_request(&request_path).await?;
    if output.is_some() {
        request.output = output;
    }

    let composition = request.compose()?;
    let manifest = composition.assemble()?;

    if verbose {
        eprintln!("{}", "Pipelines:".bold());
        for pipeline in &manifest.pipelines {
            eprintln!(
                "  {} {} ({} stages)",
                "•".cyan(),
                pipeline.name,
                pipeline.stages.len()
            );
        }
        eprintln!();
    }

    let json = if compact {
        manifest.to_json()?
    } else {
        manifest.to_json_pretty()?
    };
    let digest = manifest.digest()?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ComposeError::FileWriteError {
                        path: parent.to_path_buf(),
                        error: e.to_string(),
                    }
                })?;
            }
            tokio::fs::write(&path, format!("{}\n", json))
                .await
                .map_err(|e| ComposeError::FileWriteError {
                    path: path.clone(),
                    error: e.to_string(),
                })?;

            eprintln!(
                "{} Wrote manifest for '{}' to {}",
                "✓".green(),
                composition.output,
                path.display()
            );
        }
        None => println!("{}", json),
    }

    info!(output = %composition.output, pipelines = manifest.pipelines.len(), %digest, "manifest composed");

    Ok(())
}
