// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! # osmanifest - osbuild manifest composer
//!
//! `osmanifest` compiles declarative descriptions of operating system
//! artifacts into ordered, dependency-resolved osbuild manifests.
//!
//! ## Features
//!
//! - **Pipeline variants** - installer tree, ostree commit, commit server
//!   tree, raw image and qcow2 conversion
//! - **By-name references** - pipelines consume each other's output by name
//! - **Manifest assembly** - dependencies first, restricted to one output
//! - **Build requests** - YAML or TOML files naming packages and pipelines
//!
//! ## Quick Start
//!
//! ```bash
//! # Print the manifest for osmanifest.yaml
//! osmanifest compose
//!
//! # Check a request
//! osmanifest validate iot.toml
//!
//! # Draw the pipeline graph
//! osmanifest graph -f mermaid
//! ```

pub mod cli;
pub mod errors;
pub mod manifest;
pub mod pipeline;
pub mod request;
pub mod rpmmd;
pub mod stages;

// Re-export commonly used types
pub use errors::{ComposeError, ComposeResult};
pub use manifest::{Manifest, OrderedManifest};
pub use pipeline::{AnyPipeline, Pipeline, PipelineVariant, SerializedPipeline};
pub use request::BuildRequest;
pub use stages::{Stage, StageInput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
