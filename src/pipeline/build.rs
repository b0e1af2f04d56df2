// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Build root pipeline

use std::collections::BTreeMap;

use super::{Pipeline, PipelineVariant, SerializedPipeline};
use crate::errors::{ComposeError, ComposeResult};
use crate::rpmmd::{PackageSpec, RepoConfig};
use crate::stages::{rpm_stage, SelinuxStageOptions, Stage, SELINUX};

pub mod defaults {
    pub const NAME: &str = "build";
    /// Relative to the tree root
    pub const FILE_CONTEXTS: &str = "etc/selinux/targeted/contexts/files/file_contexts";
    /// Lets the build root's copy tools write arbitrary labels into target trees
    pub const TOOL_LABEL: &str = "system_u:object_r:install_exec_t:s0";
    pub const LABELLED_TOOLS: [&str; 2] = ["/usr/bin/cp", "/usr/bin/tar"];
}

/// The tree other pipelines' stages run in
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    base: Pipeline,
    repos: Vec<RepoConfig>,
    packages: Vec<PackageSpec>,
}

impl BuildPipeline {
    /// Create a build pipeline from the packages that make up the build root
    pub fn new(repos: &[RepoConfig], packages: &[PackageSpec]) -> ComposeResult<Self> {
        if packages.is_empty() {
            return Err(ComposeError::invalid_option(
                defaults::NAME,
                "packages",
                "a build root needs at least one package",
            ));
        }

        Ok(Self {
            base: Pipeline::new(defaults::NAME, None, None),
            repos: repos.to_vec(),
            packages: packages.to_vec(),
        })
    }

    /// Use a different pipeline name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.base.rename(name);
        self
    }

    pub fn packages(&self) -> &[PackageSpec] {
        &self.packages
    }
}

impl PipelineVariant for BuildPipeline {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn serialize(&self) -> SerializedPipeline {
        let mut pipeline = self.base.serialize();

        pipeline.add_stage(rpm_stage(&self.repos, &self.packages));

        let labels: BTreeMap<String, String> = defaults::LABELLED_TOOLS
            .iter()
            .map(|tool| (tool.to_string(), defaults::TOOL_LABEL.to_string()))
            .collect();
        pipeline.add_stage(Stage::new(
            SELINUX,
            SelinuxStageOptions {
                file_contexts: defaults::FILE_CONTEXTS.to_string(),
                labels,
            },
        ));

        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpmmd::fixtures::{package, repo};
    use crate::stages::{StageOptions, RPM};

    #[test]
    fn test_build_pipeline_stages() {
        let build = BuildPipeline::new(&[repo("baseos", None)], &[package("coreutils", "9.0")]).unwrap();
        let serialized = build.serialize();

        assert_eq!(serialized.name, "build");
        assert_eq!(serialized.build, None);
        assert_eq!(serialized.stages[0].kind, RPM);
        assert_eq!(serialized.stages[1].kind, SELINUX);
        match &serialized.stages[1].options {
            Some(StageOptions::Selinux(options)) => {
                assert_eq!(options.file_contexts, defaults::FILE_CONTEXTS);
                assert_eq!(options.labels.len(), 2);
            }
            other => panic!("Expected SELinux options, got {:?}", other),
        }
    }

    #[test]
    fn test_build_pipeline_requires_packages() {
        let result = BuildPipeline::new(&[repo("baseos", None)], &[]);
        assert!(matches!(result, Err(ComposeError::InvalidOption { .. })));
    }

    #[test]
    fn test_named_build_pipeline() {
        let build = BuildPipeline::new(&[], &[package("coreutils", "9.0")])
            .unwrap()
            .named("build-el9");
        assert_eq!(build.name(), "build-el9");
    }
}
