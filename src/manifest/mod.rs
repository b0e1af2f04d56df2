// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Manifest assembly
//!
//! Collects serialized pipelines, resolves their by-name references and
//! emits them dependencies first, together with the package sources the
//! emitted stages consume.

mod dag;
mod validation;

pub use dag::ManifestDag;
pub use validation::{ManifestValidator, ValidationResult};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::{ComposeError, ComposeResult};
use crate::pipeline::{PipelineVariant, SerializedPipeline};
use crate::rpmmd::PackageSpec;

/// Manifest format version understood by osbuild
pub const MANIFEST_VERSION: &str = "2";

/// Source type fetching files over http(s)
pub const CURL_SOURCE: &str = "org.osbuild.curl";

/// Pipelines and package sources waiting to be assembled
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pipelines: Vec<SerializedPipeline>,
    /// checksum -> url
    sources: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize and add a pipeline
    pub fn add_pipeline(&mut self, pipeline: &dyn PipelineVariant) {
        self.add_serialized(pipeline.serialize());
    }

    /// Add an already serialized pipeline
    pub fn add_serialized(&mut self, pipeline: SerializedPipeline) {
        debug!(pipeline = %pipeline.name, stages = pipeline.stages.len(), "adding pipeline");
        self.pipelines.push(pipeline);
    }

    /// Record where the files of `packages` can be fetched from
    pub fn add_packages(&mut self, packages: &[PackageSpec]) {
        for package in packages {
            self.sources
                .insert(package.checksum.clone(), package.remote_location.clone());
        }
    }

    /// Pipelines in the order they were added
    pub fn pipelines(&self) -> &[SerializedPipeline] {
        &self.pipelines
    }

    pub(crate) fn source_url(&self, checksum: &str) -> Option<&str> {
        self.sources.get(checksum).map(String::as_str)
    }

    /// Dependency graph of all added pipelines
    pub fn dag(&self) -> ComposeResult<ManifestDag> {
        ManifestDag::build(&self.pipelines)
    }

    /// Order the pipelines needed for `output` (all of them when `None`)
    pub fn assemble(&self, output: Option<&str>) -> ComposeResult<OrderedManifest> {
        let dag = self.dag()?;
        let order = match output {
            Some(name) => dag.closure_order(name)?,
            None => dag.topological_order()?,
        };

        let pipelines: Vec<SerializedPipeline> =
            order.into_iter().map(|idx| self.pipelines[idx].clone()).collect();

        let mut items = BTreeMap::new();
        for pipeline in &pipelines {
            for checksum in pipeline.source_references() {
                let url = self.source_url(checksum).ok_or_else(|| ComposeError::InvalidPipeline {
                    reason: format!(
                        "pipeline '{}' uses '{}', which no package set provides",
                        pipeline.name, checksum
                    ),
                })?;
                items.insert(checksum.to_string(), url.to_string());
            }
        }

        let mut sources = BTreeMap::new();
        if !items.is_empty() {
            sources.insert(CURL_SOURCE.to_string(), SourceItems { items });
        }

        debug!(
            pipelines = pipelines.len(),
            skipped = self.pipelines.len() - pipelines.len(),
            "assembled manifest"
        );

        Ok(OrderedManifest {
            version: MANIFEST_VERSION.to_string(),
            pipelines,
            sources,
        })
    }
}

/// Files fetched by one source type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceItems {
    /// checksum -> url
    pub items: BTreeMap<String, String>,
}

/// A manifest with every pipeline after the pipelines it references
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedManifest {
    pub version: String,
    pub pipelines: Vec<SerializedPipeline>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourceItems>,
}

impl OrderedManifest {
    pub fn to_json(&self) -> ComposeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> ComposeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// BLAKE3 digest of the compact JSON encoding
    pub fn digest(&self) -> ComposeResult<String> {
        let json = self.to_json()?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name.as_str()).collect()
    }
}
