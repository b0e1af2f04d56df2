// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Pipeline definitions and variants
//!
//! A pipeline is a named, ordered list of stages. It may run inside the tree
//! of a build pipeline and may consume other pipelines' outputs, always by
//! name. Each variant owns the ordering of its own stages; the shared
//! [`Pipeline`] value only carries identity and the append-only stage list.

mod anaconda;
mod build;
mod commit_server;
mod ostree_commit;
mod qcow2;
mod raw_image;

pub use anaconda::{dracut_modules, AnacondaTreePipeline, InstallerTreeConfig};
pub use build::BuildPipeline;
pub use commit_server::{CommitServerConfig, CommitServerTreePipeline};
pub use ostree_commit::{OstreeCommitConfig, OstreeCommitPipeline};
pub use qcow2::{Qcow2Config, Qcow2Pipeline};
pub use raw_image::{RawImageConfig, RawImagePipeline};

/// Fixed literals used by each variant
pub mod defaults {
    pub use super::anaconda::defaults as installer;
    pub use super::build::defaults as build;
    pub use super::commit_server::defaults as commit_server;
    pub use super::ostree_commit::defaults as ostree_commit;
    pub use super::qcow2::defaults as qcow2;
    pub use super::raw_image::defaults as raw_image;
}

use serde::{Serialize, Serializer};

use crate::stages::{pipeline_ref, Stage};

/// Identity and stages shared by every pipeline variant
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    name: String,
    build: Option<String>,
    reference: Option<String>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create a pipeline running in `build`'s tree, or the host's when `None`
    pub fn new(name: impl Into<String>, build: Option<&BuildPipeline>, reference: Option<String>) -> Self {
        Self {
            name: name.into(),
            build: build.map(|b| b.name().to_string()),
            reference,
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the build pipeline providing the execution root
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Handle of the artifact this pipeline produces, for downstream consumers
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Append a stage; stages run in insertion order
    pub fn add_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn serialize(&self) -> SerializedPipeline {
        SerializedPipeline {
            name: self.name.clone(),
            build: self.build.clone(),
            stages: self.stages.clone(),
        }
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// A pipeline as handed to the manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedPipeline {
    pub name: String,

    /// Build pipeline name; serialized as a `name:` reference
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_build_ref"
    )]
    pub build: Option<String>,

    pub stages: Vec<Stage>,
}

fn serialize_build_ref<S: Serializer>(build: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match build {
        Some(name) => serializer.serialize_str(&pipeline_ref(name)),
        None => serializer.serialize_none(),
    }
}

/// Stages can only be appended inside the crate, while a variant builds its
/// serialized form; callers get the finished list.
///
/// ```compile_fail
/// use osmanifest::stages::{LocaleStageOptions, LOCALE};
/// use osmanifest::{Pipeline, Stage};
///
/// let mut serialized = Pipeline::new("os", None, None).serialize();
/// serialized.add_stage(Stage::new(LOCALE, LocaleStageOptions { language: "C".into() }));
/// ```
impl SerializedPipeline {
    pub(crate) fn add_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Position of the first stage of `kind`
    pub fn stage_index(&self, kind: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.kind == kind)
    }

    /// All stages of `kind`, in order
    pub fn stages_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Stage> + 'a {
        self.stages.iter().filter(move |s| s.kind == kind)
    }

    /// Pipelines that must precede this one: the build pipeline, then stage inputs
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        let upstream = self.build.as_deref().into_iter().chain(
            self.stages
                .iter()
                .flat_map(|stage| stage.upstream_pipelines()),
        );
        for name in upstream {
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
        deps
    }

    /// Checksums of all source files the stages consume
    pub fn source_references(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .flat_map(|stage| stage.inputs.values())
            .flat_map(|input| input.source_references())
            .map(String::as_str)
    }
}

/// Capabilities every pipeline variant provides
pub trait PipelineVariant {
    fn name(&self) -> &str;

    fn reference(&self) -> Option<&str> {
        None
    }

    /// Emit the pipeline with its stages in execution order
    fn serialize(&self) -> SerializedPipeline;
}

/// A pipeline producing an identified commit
pub trait CommitSource: PipelineVariant {
    fn commit_ref(&self) -> &str;
}

/// A pipeline producing a disk image file
pub trait ImageSource: PipelineVariant {
    fn filename(&self) -> &str;
}

/// Any known pipeline variant
#[derive(Debug, Clone)]
pub enum AnyPipeline {
    Build(BuildPipeline),
    AnacondaTree(AnacondaTreePipeline),
    OstreeCommit(OstreeCommitPipeline),
    CommitServerTree(CommitServerTreePipeline),
    RawImage(RawImagePipeline),
    Qcow2(Qcow2Pipeline),
}

impl AnyPipeline {
    /// Variant name, as used in build requests
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::AnacondaTree(_) => "anaconda-tree",
            Self::OstreeCommit(_) => "ostree-commit",
            Self::CommitServerTree(_) => "commit-server-tree",
            Self::RawImage(_) => "raw-image",
            Self::Qcow2(_) => "qcow2",
        }
    }

    pub fn as_build(&self) -> Option<&BuildPipeline> {
        match self {
            Self::Build(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_commit_source(&self) -> Option<&dyn CommitSource> {
        match self {
            Self::OstreeCommit(p) => Some(p as &dyn CommitSource),
            _ => None,
        }
    }

    pub fn as_image_source(&self) -> Option<&dyn ImageSource> {
        match self {
            Self::RawImage(p) => Some(p as &dyn ImageSource),
            _ => None,
        }
    }

    fn variant(&self) -> &dyn PipelineVariant {
        match self {
            Self::Build(p) => p,
            Self::AnacondaTree(p) => p,
            Self::OstreeCommit(p) => p,
            Self::CommitServerTree(p) => p,
            Self::RawImage(p) => p,
            Self::Qcow2(p) => p,
        }
    }
}

impl PipelineVariant for AnyPipeline {
    fn name(&self) -> &str {
        self.variant().name()
    }

    fn reference(&self) -> Option<&str> {
        self.variant().reference()
    }

    fn serialize(&self) -> SerializedPipeline {
        self.variant().serialize()
    }
}

impl From<BuildPipeline> for AnyPipeline {
    fn from(p: BuildPipeline) -> Self {
        Self::Build(p)
    }
}

impl From<AnacondaTreePipeline> for AnyPipeline {
    fn from(p: AnacondaTreePipeline) -> Self {
        Self::AnacondaTree(p)
    }
}

impl From<OstreeCommitPipeline> for AnyPipeline {
    fn from(p: OstreeCommitPipeline) -> Self {
        Self::OstreeCommit(p)
    }
}

impl From<CommitServerTreePipeline> for AnyPipeline {
    fn from(p: CommitServerTreePipeline) -> Self {
        Self::CommitServerTree(p)
    }
}

impl From<RawImagePipeline> for AnyPipeline {
    fn from(p: RawImagePipeline) -> Self {
        Self::RawImage(p)
    }
}

impl From<Qcow2Pipeline> for AnyPipeline {
    fn from(p: Qcow2Pipeline) -> Self {
        Self::Qcow2(p)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{LocaleStageOptions, StageInput, LOCALE};

    fn locale_stage(language: &str) -> Stage {
        Stage::new(
            LOCALE,
            LocaleStageOptions {
                language: language.into(),
            },
        )
    }

    #[test]
    fn test_serialize_keeps_insertion_order() {
        let mut pipeline = Pipeline::new("tree", None, Some("abc".into()));
        pipeline.add_stage(locale_stage("de_DE"));
        pipeline.add_stage(locale_stage("en_US"));

        let serialized = pipeline.serialize();
        assert_eq!(serialized.name, "tree");
        assert_eq!(serialized.build, None);
        assert_eq!(serialized.stages.len(), 2);
        assert_eq!(serialized.stages[1], locale_stage("en_US"));
        assert_eq!(pipeline.reference(), Some("abc"));
    }

    #[test]
    fn test_build_reference_serializes_with_prefix() {
        let mut serialized = Pipeline::new("tree", None, None).serialize();
        serialized.build = Some("build".into());

        let value = serde_json::to_value(&serialized).unwrap();
        assert_eq!(value["build"], "name:build");
        assert_eq!(value["stages"], serde_json::json!([]));
    }

    #[test]
    fn test_build_omitted_without_build_pipeline() {
        let value = serde_json::to_value(Pipeline::new("build", None, None).serialize()).unwrap();
        assert!(value.get("build").is_none());
    }

    #[test]
    fn test_dependencies_are_deduplicated_in_order() {
        let mut serialized = Pipeline::new("qcow2", None, None).serialize();
        serialized.build = Some("build".into());
        serialized.add_stage(
            locale_stage("en_US").with_input("image", StageInput::pipeline_file("image", "a.img")),
        );
        serialized.add_stage(
            locale_stage("en_US")
                .with_input("commits", StageInput::pipeline("commit", "ref"))
                .with_input("tree", StageInput::pipeline_tree("image")),
        );
        serialized.add_stage(
            locale_stage("en_US").with_input("build", StageInput::pipeline_tree("build")),
        );

        assert_eq!(serialized.dependencies(), vec!["build", "image", "commit"]);
    }
}
