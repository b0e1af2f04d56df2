// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! osmanifest - osbuild manifest composer
//!
//! Compose installer, commit-server and disk image pipelines into ordered manifests.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osmanifest::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the manifest
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osmanifest=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    match cli.command {
        Commands::Compose {
            request,
            out,
            output,
            compact,
        } => osmanifest::cli::compose::run(request, out, output, compact, cli.verbose).await,
        Commands::Validate { request } => {
            osmanifest::cli::validate::run(request, cli.verbose).await
        }
        Commands::Graph { request, format } => {
            osmanifest::cli::graph::run(request, format, cli.verbose).await
        }
    }
}
