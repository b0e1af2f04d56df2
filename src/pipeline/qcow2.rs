// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! qcow2 conversion pipeline

use serde::{Deserialize, Serialize};

use super::{BuildPipeline, ImageSource, Pipeline, PipelineVariant, SerializedPipeline};
use crate::errors::{ComposeError, ComposeResult};
use crate::stages::{QemuFormat, QemuStageOptions, Stage, StageInput, QEMU};

pub mod defaults {
    pub const NAME: &str = "qcow2";
    /// Compatibility levels qemu-img accepts for qcow2
    pub const COMPAT_LEVELS: [&str; 2] = ["0.10", "1.1"];
}

/// Parameters of a qcow2 conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qcow2Config {
    /// Name of the produced qcow2 file
    pub filename: String,

    /// qcow2 compatibility level; qemu's default when unset
    #[serde(default)]
    pub compat: Option<String>,
}

/// Turns a raw image file into a qcow2 image
#[derive(Debug, Clone)]
pub struct Qcow2Pipeline {
    base: Pipeline,
    image_pipeline: String,
    image_file: String,
    config: Qcow2Config,
}

impl Qcow2Pipeline {
    /// Create a qcow2 pipeline converting the file produced by `image`
    pub fn new(
        build: Option<&BuildPipeline>,
        image: &dyn ImageSource,
        config: Qcow2Config,
    ) -> ComposeResult<Self> {
        let name = defaults::NAME;

        ComposeError::require_non_empty(name, "filename", &config.filename)?;
        ComposeError::require_non_empty(name, "image filename", image.filename())?;
        if let Some(compat) = &config.compat {
            if !defaults::COMPAT_LEVELS.contains(&compat.as_str()) {
                return Err(ComposeError::invalid_option(
                    name,
                    "compat",
                    format!(
                        "'{}' is not one of {}",
                        compat,
                        defaults::COMPAT_LEVELS.join(", ")
                    ),
                ));
            }
        }

        Ok(Self {
            base: Pipeline::new(name, build, None),
            image_pipeline: image.name().to_string(),
            image_file: image.filename().to_string(),
            config,
        })
    }

    /// Use a different pipeline name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.base.rename(name);
        self
    }

    pub fn filename(&self) -> &str {
        &self.config.filename
    }
}

impl PipelineVariant for Qcow2Pipeline {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn serialize(&self) -> SerializedPipeline {
        let mut pipeline = self.base.serialize();

        pipeline.add_stage(
            Stage::new(
                QEMU,
                QemuStageOptions {
                    filename: self.config.filename.clone(),
                    format: QemuFormat::Qcow2 {
                        compat: self.config.compat.clone(),
                    },
                },
            )
            .with_input(
                "image",
                StageInput::pipeline_file(&self.image_pipeline, &self.image_file),
            ),
        );

        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeUpstream;

    #[test]
    fn test_single_qemu_stage_references_image_file() {
        let image = FakeUpstream::new("image", "", "disk.img");

        for (filename, compat) in [("disk.qcow2", None), ("other.qcow2", Some("0.10"))] {
            let pipeline = Qcow2Pipeline::new(
                None,
                &image,
                Qcow2Config {
                    filename: filename.into(),
                    compat: compat.map(String::from),
                },
            )
            .unwrap();
            let serialized = pipeline.serialize();

            assert_eq!(serialized.stages.len(), 1);
            assert_eq!(serialized.stages[0].kind, QEMU);
            assert_eq!(
                serialized.stages[0].input("image"),
                Some(&StageInput::PipelineFile {
                    name: "image".into(),
                    file: "disk.img".into(),
                })
            );
            assert_eq!(serialized.dependencies(), vec!["image"]);
        }
    }

    #[test]
    fn test_format_options() {
        let image = FakeUpstream::new("image", "", "disk.img");
        let pipeline = Qcow2Pipeline::new(
            None,
            &image,
            Qcow2Config {
                filename: "disk.qcow2".into(),
                compat: Some("1.1".into()),
            },
        )
        .unwrap();

        let value = serde_json::to_value(pipeline.serialize()).unwrap();
        assert_eq!(value["stages"][0]["options"]["filename"], "disk.qcow2");
        assert_eq!(value["stages"][0]["options"]["format"]["type"], "qcow2");
        assert_eq!(value["stages"][0]["options"]["format"]["compat"], "1.1");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let image = FakeUpstream::new("image", "", "disk.img");
        let bad = [
            Qcow2Config {
                filename: String::new(),
                compat: None,
            },
            Qcow2Config {
                filename: "disk.qcow2".into(),
                compat: Some("2".into()),
            },
        ];
        for config in bad {
            let result = Qcow2Pipeline::new(None, &image, config);
            assert!(matches!(result, Err(ComposeError::InvalidOption { .. })));
        }

        let no_file = FakeUpstream::new("image", "", "");
        let result = Qcow2Pipeline::new(
            None,
            &no_file,
            Qcow2Config {
                filename: "disk.qcow2".into(),
                compat: None,
            },
        );
        assert!(matches!(result, Err(ComposeError::InvalidOption { .. })));
    }
}
