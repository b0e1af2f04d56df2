// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Raw disk image pipeline

use serde::{Deserialize, Serialize};

use super::{BuildPipeline, ImageSource, Pipeline, PipelineVariant, SerializedPipeline};
use crate::errors::{ComposeError, ComposeResult};
use crate::stages::{
    CopyPath, CopyStageOptions, Stage, StageInput, TruncateStageOptions, COPY, TRUNCATE,
};

pub mod defaults {
    pub const NAME: &str = "image";
    pub const COPY_FROM: &str = "input://tree/";
    pub const COPY_TO: &str = "mount://root/";
}

/// Parameters of a raw disk image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImageConfig {
    /// Name of the produced image file
    pub filename: String,

    /// Image size in bytes
    pub size: u64,
}

/// Writes the tree of another pipeline into a raw disk image file
#[derive(Debug, Clone)]
pub struct RawImagePipeline {
    base: Pipeline,
    tree_pipeline: String,
    config: RawImageConfig,
}

impl RawImagePipeline {
    pub fn new(
        build: Option<&BuildPipeline>,
        tree: &dyn PipelineVariant,
        config: RawImageConfig,
    ) -> ComposeResult<Self> {
        ComposeError::require_non_empty(defaults::NAME, "filename", &config.filename)?;
        if config.size == 0 {
            return Err(ComposeError::invalid_option(defaults::NAME, "size", "must be greater than zero"));
        }

        Ok(Self {
            base: Pipeline::new(defaults::NAME, build, None),
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

impl PipelineVariant for RawImagePipeline {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn serialize(&self) -> SerializedPipeline {
        let mut pipeline = self.base.serialize();

        pipeline.add_stage(Stage::new(
            TRUNCATE,
            TruncateStageOptions {
                filename: self.config.filename.clone(),
                size: self.config.size.to_string(),
            },
        ));
        pipeline.add_stage(
            Stage::new(
                COPY,
                CopyStageOptions {
                    paths: vec![CopyPath {
                        from: defaults::COPY_FROM.to_string(),
                        to: defaults::COPY_TO.to_string(),
                    }],
                },
            )
            .with_input("tree", StageInput::pipeline_tree(&self.tree_pipeline)),
        );

        pipeline
    }
}

impl ImageSource for RawImagePipeline {
    fn filename(&self) -> &str {
        &self.config.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeUpstream;

    #[test]
    fn test_raw_image_stages() {
        let tree = FakeUpstream::new("os", "", "");
        let image = RawImagePipeline::new(
            None,
            &tree,
            RawImageConfig {
                filename: "disk.img".into(),
                size: 10 * 1024 * 1024 * 1024,
            },
        )
        .unwrap();

        assert_eq!(image.filename(), "disk.img");
        let value = serde_json::to_value(image.serialize()).unwrap();
        assert_eq!(value["name"], "image");
        assert_eq!(value["stages"][0]["type"], TRUNCATE);
        assert_eq!(value["stages"][0]["options"]["size"], "10737418240");
        assert_eq!(value["stages"][1]["type"], COPY);
        assert_eq!(value["stages"][1]["inputs"]["tree"]["kind"], "pipeline-tree");
    }

    #[test]
    fn test_zero_size_rejected() {
        let tree = FakeUpstream::new("os", "", "");
        let result = RawImagePipeline::new(
            None,
            &tree,
            RawImageConfig {
                filename: "disk.img".into(),
                size: 0,
            },
        );
        assert!(matches!(result, Err(ComposeError::InvalidOption { .. })));
    }
}
