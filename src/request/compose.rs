// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Turning a build request into pipelines

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use super::{BuildRequest, PipelineKind, PipelineRequest};
use crate::errors::{ComposeError, ComposeResult};
use crate::manifest::{Manifest, ManifestValidator, OrderedManifest, ValidationResult};
use crate::pipeline::{
    AnacondaTreePipeline, AnyPipeline, BuildPipeline, CommitServerTreePipeline,
    OstreeCommitPipeline, Qcow2Pipeline, RawImagePipeline,
};
use crate::rpmmd::PackageSpec;

/// The pipelines of a request, collected into a manifest
#[derive(Debug)]
pub struct Composition {
    pub manifest: Manifest,
    pub pipelines: Vec<AnyPipeline>,
    pub output: String,
}

impl Composition {
    /// Order the pipelines needed for the requested output
    pub fn assemble(&self) -> ComposeResult<OrderedManifest> {
        self.manifest.assemble(Some(&self.output))
    }

    /// Check the composed manifest without assembling it
    pub fn validate(&self) -> ValidationResult {
        ManifestValidator::validate(&self.manifest, Some(&self.output))
    }
}

impl BuildRequest {
    /// Construct every requested pipeline
    ///
    /// Pipelines may only refer to pipelines declared before them.
    pub fn compose(&self) -> ComposeResult<Composition> {
        let output = self.output_name().ok_or_else(|| ComposeError::InvalidRequest {
            reason: "no pipelines requested".into(),
            help: Some("Add at least one entry under 'pipelines'".into()),
        })?;

        let mut composer = Composer::new(self);
        for request in &self.pipelines {
            composer.add(request)?;
        }

        let used_sets: BTreeSet<&str> = self
            .pipelines
            .iter()
            .filter_map(|p| p.kind.package_set())
            .collect();

        let mut manifest = Manifest::new();
        for set in used_sets {
            if let Some(packages) = self.package_sets.get(set) {
                manifest.add_packages(packages);
            }
        }
        for pipeline in &composer.pipelines {
            manifest.add_pipeline(pipeline);
        }

        info!(pipelines = composer.pipelines.len(), output = %output, "composed request");

        Ok(Composition {
            manifest,
            pipelines: composer.pipelines,
            output,
        })
    }
}

struct Composer<'a> {
    request: &'a BuildRequest,
    pipelines: Vec<AnyPipeline>,
    by_name: HashMap<String, usize>,
}

impl<'a> Composer<'a> {
    fn new(request: &'a BuildRequest) -> Self {
        Self {
            request,
            pipelines: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn add(&mut self, request: &PipelineRequest) -> ComposeResult<()> {
        let name = request.resolved_name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ComposeError::DuplicatePipeline { name });
        }

        let unknown = request.unknown_keys()?;
        if !unknown.is_empty() {
            return Err(ComposeError::InvalidRequest {
                reason: format!(
                    "pipeline '{}' has unknown key(s): {}",
                    name,
                    unknown.join(", ")
                ),
                help: Some(format!(
                    "Check the spelling against the '{}' pipeline options",
                    request.kind.type_name()
                )),
            });
        }

        let pipeline = self.construct(&name, request)?;
        let pipeline = Self::rename(pipeline, request.name.as_deref());
        debug!(pipeline = %name, kind = pipeline.kind(), "constructed pipeline");

        self.by_name.insert(name, self.pipelines.len());
        self.pipelines.push(pipeline);
        Ok(())
    }

    fn construct(&self, name: &str, request: &PipelineRequest) -> ComposeResult<AnyPipeline> {
        let repos = &self.request.repositories;

        if let (PipelineKind::Build { .. }, Some(build)) = (&request.kind, &request.build) {
            return Err(ComposeError::InvalidRequest {
                reason: format!("build pipeline '{}' cannot itself use build '{}'", name, build),
                help: Some("Remove the 'build' key from the build pipeline".into()),
            });
        }
        let build = self.build(name, request.build.as_deref())?;

        let pipeline: AnyPipeline = match &request.kind {
            PipelineKind::Build { package_set } => {
                let packages = self.packages(name, package_set)?;
                BuildPipeline::new(repos, packages)?.into()
            }
            PipelineKind::AnacondaTree {
                package_set,
                config,
            } => {
                let packages = self.packages(name, package_set)?;
                AnacondaTreePipeline::new(build, repos, packages, config.clone())?.into()
            }
            PipelineKind::OstreeCommit { tree, config } => {
                let tree = self.lookup(name, tree)?;
                OstreeCommitPipeline::new(build, tree, config.clone())?.into()
            }
            PipelineKind::CommitServerTree {
                package_set,
                commit,
                config,
            } => {
                let packages = self.packages(name, package_set)?;
                let commit = self
                    .lookup(name, commit)?
                    .as_commit_source()
                    .ok_or_else(|| incompatible(name, commit, "an ostree-commit pipeline"))?;
                CommitServerTreePipeline::new(build, repos, packages, commit, config.clone())?
                    .into()
            }
            PipelineKind::RawImage { tree, config } => {
                let tree = self.lookup(name, tree)?;
                RawImagePipeline::new(build, tree, config.clone())?.into()
            }
            PipelineKind::Qcow2 { image, config } => {
                let image = self
                    .lookup(name, image)?
                    .as_image_source()
                    .ok_or_else(|| incompatible(name, image, "a raw-image pipeline"))?;
                Qcow2Pipeline::new(build, image, config.clone())?.into()
            }
        };

        Ok(pipeline)
    }

    fn rename(pipeline: AnyPipeline, name: Option<&str>) -> AnyPipeline {
        let Some(name) = name else {
            return pipeline;
        };
        match pipeline {
            AnyPipeline::Build(p) => p.named(name).into(),
            AnyPipeline::AnacondaTree(p) => p.named(name).into(),
            AnyPipeline::OstreeCommit(p) => p.named(name).into(),
            AnyPipeline::CommitServerTree(p) => p.named(name).into(),
            AnyPipeline::RawImage(p) => p.named(name).into(),
            AnyPipeline::Qcow2(p) => p.named(name).into(),
        }
    }

    fn lookup(&self, pipeline: &str, reference: &str) -> ComposeResult<&AnyPipeline> {
        self.by_name
            .get(reference)
            .map(|idx| &self.pipelines[*idx])
            .ok_or_else(|| ComposeError::UnknownPipeline {
                pipeline: pipeline.to_string(),
                reference: reference.to_string(),
            })
    }

    fn build(&self, pipeline: &str, reference: Option<&str>) -> ComposeResult<Option<&BuildPipeline>> {
        let Some(reference) = reference else {
            return Ok(None);
        };
        self.lookup(pipeline, reference)?
            .as_build()
            .map(Some)
            .ok_or_else(|| incompatible(pipeline, reference, "a build pipeline"))
    }

    fn packages(&self, pipeline: &str, set: &str) -> ComposeResult<&'a [PackageSpec]> {
        let request: &'a BuildRequest = self.request;
        request
            .package_sets
            .get(set)
            .map(Vec::as_slice)
            .ok_or_else(|| ComposeError::UnknownPackageSet {
                pipeline: pipeline.to_string(),
                name: set.to_string(),
            })
    }
}

fn incompatible(pipeline: &str, reference: &str, expected: &str) -> ComposeError {
    ComposeError::IncompatibleReference {
        pipeline: pipeline.to_string(),
        reference: reference.to_string(),
        expected: expected.to_string(),
    }
}
