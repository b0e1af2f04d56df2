// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for osmanifest.

pub mod compose;
pub mod graph;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::ComposeError;
use crate::request::{BuildRequest, RequestFormat, DEFAULT_REQUEST_FILE};

/// osbuild manifest composer
///
/// Compose installer, commit-server and disk image pipelines into manifests.
#[derive(Parser, Debug)]
#[clap(
    name = "osmanifest",
    version,
    about = "Compose installer, commit-server and disk image pipelines into osbuild manifests",
    long_about = None,
    after_help = "Examples:\n\
        osmanifest compose                       Print the manifest for osmanifest.yaml\n\
        osmanifest compose iot.yaml -o out.json  Write the manifest to a file\n\
        osmanifest validate iot.toml             Check a request without composing\n\
        osmanifest graph -f dot | dot -Tsvg      Draw the pipeline graph\n\n\
        See 'osmanifest <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a build request into a manifest
    Compose {
        /// Build request file (YAML or TOML)
        #[clap(default_value = DEFAULT_REQUEST_FILE)]
        request: PathBuf,

        /// Write the manifest to a file instead of stdout
        #[clap(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Pipeline to build the manifest for (overrides the request)
        #[clap(long, value_name = "NAME")]
        output: Option<String>,

        /// Emit compact JSON
        #[clap(long)]
        compact: bool,
    },

    /// Validate a build request
    Validate {
        /// Build request file to validate
        #[clap(default_value = DEFAULT_REQUEST_FILE)]
        request: PathBuf,
    },

    /// Show the pipeline dependencies as a graph
    Graph {
        /// Build request file
        #[clap(default_value = DEFAULT_REQUEST_FILE)]
        request: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value = "text")]
        format: GraphFormat,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Pipelines in assembly order
    Text,
    /// Graphviz
    Dot,
    Mermaid,
}

/// Read and parse a build request
pub(crate) async fn load_request(path: &Path) -> Result<BuildRequest, ComposeError> {
    if !path.exists() {
        return Err(ComposeError::RequestNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ComposeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

    let format = RequestFormat::from_path(path);
    debug!(path = %path.display(), ?format, "loading build request");

    BuildRequest::parse(&content, format)
}
