// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! OSTree commit pipeline

use serde::{Deserialize, Serialize};

use super::{BuildPipeline, CommitSource, Pipeline, PipelineVariant, SerializedPipeline};
use crate::errors::{ComposeError, ComposeResult};
use crate::stages::{
    OstreeCommitStageOptions, OstreeInitStageOptions, Stage, StageInput, OSTREE_COMMIT,
    OSTREE_INIT,
};

pub mod defaults {
    pub const NAME: &str = "ostree-commit";
    pub const REPO_PATH: &str = "/repo";
}

/// Parameters of an ostree commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstreeCommitConfig {
    /// Branch the commit is made on, e.g. `fedora/36/x86_64/iot`
    #[serde(rename = "ref")]
    pub reference: String,

    #[serde(default)]
    pub os_version: Option<String>,

    /// Checksum of the parent commit
    #[serde(default)]
    pub parent: Option<String>,
}

/// Commits the tree of another pipeline into a fresh repository
#[derive(Debug, Clone)]
pub struct OstreeCommitPipeline {
    base: Pipeline,
    tree_pipeline: String,
    config: OstreeCommitConfig,
}

impl OstreeCommitPipeline {
    pub fn new(
        build: Option<&BuildPipeline>,
        tree: &dyn PipelineVariant,
        config: OstreeCommitConfig,
    ) -> ComposeResult<Self> {
        ComposeError::require_non_empty(defaults::NAME, "ref", &config.reference)?;

        Ok(Self {
            base: Pipeline::new(defaults::NAME, build, Some(config.reference.clone())),
            tree_pipeline: tree.name().to_string(),
            config,
        })
    }

    /// Use a different pipeline name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.base.rename(name);
        self
    }
}

impl PipelineVariant for OstreeCommitPipeline {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn reference(&self) -> Option<&str> {
        self.base.reference()
    }

    fn serialize(&self) -> SerializedPipeline {
        let mut pipeline = self.base.serialize();

        pipeline.add_stage(Stage::new(
            OSTREE_INIT,
            OstreeInitStageOptions {
                path: defaults::REPO_PATH.to_string(),
            },
        ));
        pipeline.add_stage(
            Stage::new(
                OSTREE_COMMIT,
                OstreeCommitStageOptions {
                    reference: self.config.reference.clone(),
                    os_version: self.config.os_version.clone(),
                    parent: self.config.parent.clone(),
                },
            )
            .with_input("tree", StageInput::pipeline_tree(&self.tree_pipeline)),
        );

        pipeline
    }
}

impl CommitSource for OstreeCommitPipeline {
    fn commit_ref(&self) -> &str {
        &self.config.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeUpstream;

    #[test]
    fn test_commit_exposes_ref() {
        let tree = FakeUpstream::new("os", "", "");
        let commit = OstreeCommitPipeline::new(
            None,
            &tree,
            OstreeCommitConfig {
                reference: "fedora/36/x86_64/iot".into(),
                os_version: Some("36".into()),
                parent: None,
            },
        )
        .unwrap();

        assert_eq!(commit.reference(), Some("fedora/36/x86_64/iot"));
        assert_eq!(commit.commit_ref(), "fedora/36/x86_64/iot");

        let value = serde_json::to_value(commit.serialize()).unwrap();
        assert_eq!(value["stages"][0]["options"]["path"], "/repo");
        assert_eq!(value["stages"][1]["options"]["ref"], "fedora/36/x86_64/iot");
        assert_eq!(value["stages"][1]["options"]["os_version"], "36");
        assert_eq!(value["stages"][1]["inputs"]["tree"]["name"], "os");
        assert!(value["stages"][1]["options"].get("parent").is_none());
    }

    #[test]
    fn test_empty_ref_rejected() {
        let tree = FakeUpstream::new("os", "", "");
        let result = OstreeCommitPipeline::new(
            None,
            &tree,
            OstreeCommitConfig {
                reference: String::new(),
                os_version: None,
                parent: None,
            },
        );
        assert!(matches!(result, Err(ComposeError::InvalidOption { .. })));
    }
}
