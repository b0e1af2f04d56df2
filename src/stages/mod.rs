// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Stage descriptors
//!
//! A stage is one operation the build engine applies to a pipeline's tree:
//! a type, a typed options payload and optional named inputs. Inputs that
//! point at other pipelines are by-name references, resolved by the engine.

mod disk;
mod installer;
mod ostree;
mod rpm;
mod server;
mod system;

pub use disk::*;
pub use installer::*;
pub use ostree::*;
pub use rpm::*;
pub use server::*;
pub use system::*;

use serde::Serialize;
use std::collections::BTreeMap;

/// Prefix the engine expects in front of a pipeline name inside references
pub const PIPELINE_REF_PREFIX: &str = "name:";

/// Reference string for a pipeline name (`name:<pipeline>`)
pub fn pipeline_ref(name: &str) -> String {
    format!("{}{}", PIPELINE_REF_PREFIX, name)
}

/// A single stage in a pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    /// Stage type understood by the build engine, e.g. `org.osbuild.rpm`
    #[serde(rename = "type")]
    pub kind: String,

    /// Named inputs, keyed by the name the stage expects
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, StageInput>,

    /// Typed options payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<StageOptions>,
}

impl Stage {
    /// Create a stage of `kind` with the given options
    pub fn new(kind: &str, options: impl Into<StageOptions>) -> Self {
        Self {
            kind: kind.to_string(),
            inputs: BTreeMap::new(),
            options: Some(options.into()),
        }
    }

    /// Attach a named input
    pub fn with_input(mut self, name: &str, input: StageInput) -> Self {
        self.inputs.insert(name.to_string(), input);
        self
    }

    /// Get an input by name
    pub fn input(&self, name: &str) -> Option<&StageInput> {
        self.inputs.get(name)
    }

    /// Names of the pipelines this stage consumes
    pub fn upstream_pipelines(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().filter_map(StageInput::upstream)
    }
}

/// A stage input
///
/// The pipeline-sourced shapes are distinct on purpose: `Pipeline` consumes an
/// identified artifact (a commit ref), `PipelineFile` consumes one file a
/// pipeline wrote, `PipelineTree` consumes the whole tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StageInput {
    /// An identified artifact produced by a pipeline; `name` is `name:<pipeline>`
    Pipeline {
        name: String,
        #[serde(rename = "ref")]
        reference: String,
    },

    /// A file produced by a pipeline
    PipelineFile { name: String, file: String },

    /// The complete tree of a pipeline
    PipelineTree { name: String },

    /// Content-addressed source files, e.g. package checksums
    Source { references: Vec<String> },
}

impl StageInput {
    /// Consume the artifact `reference` produced by `pipeline`
    pub fn pipeline(pipeline: &str, reference: &str) -> Self {
        Self::Pipeline {
            name: pipeline_ref(pipeline),
            reference: reference.to_string(),
        }
    }

    /// Consume `file` written by `pipeline`
    pub fn pipeline_file(pipeline: &str, file: &str) -> Self {
        Self::PipelineFile {
            name: pipeline.to_string(),
            file: file.to_string(),
        }
    }

    /// Consume the tree of `pipeline`
    pub fn pipeline_tree(pipeline: &str) -> Self {
        Self::PipelineTree {
            name: pipeline.to_string(),
        }
    }

    /// Consume source files by checksum
    pub fn source(references: Vec<String>) -> Self {
        Self::Source { references }
    }

    /// Name of the pipeline this input depends on, if any
    pub fn upstream(&self) -> Option<&str> {
        match self {
            Self::Pipeline { name, .. } => {
                Some(name.strip_prefix(PIPELINE_REF_PREFIX).unwrap_or(name.as_str()))
            }
            Self::PipelineFile { name, .. } | Self::PipelineTree { name } => Some(name.as_str()),
            Self::Source { .. } => None,
        }
    }

    /// Source checksums referenced by this input
    pub fn source_references(&self) -> &[String] {
        match self {
            Self::Source { references } => references,
            _ => &[],
        }
    }
}

/// Options payload of a stage, one variant per stage type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOptions {
    Rpm(RpmStageOptions),
    Buildstamp(BuildstampStageOptions),
    Locale(LocaleStageOptions),
    Users(UsersStageOptions),
    Anaconda(AnacondaStageOptions),
    LoraxScript(LoraxScriptStageOptions),
    Dracut(DracutStageOptions),
    SelinuxConfig(SelinuxConfigStageOptions),
    Selinux(SelinuxStageOptions),
    Chmod(ChmodStageOptions),
    OstreeInit(OstreeInitStageOptions),
    OstreePull(OstreePullStageOptions),
    OstreeCommit(OstreeCommitStageOptions),
    NginxConfig(NginxConfigStageOptions),
    Qemu(QemuStageOptions),
    Truncate(TruncateStageOptions),
    Copy(CopyStageOptions),
}

macro_rules! stage_options_from {
    ($($variant:ident => $options:ty),* $(,)?) => {
        $(
            impl From<$options> for StageOptions {
                fn from(options: $options) -> Self {
                    Self::$variant(options)
                }
            }
        )*
    };
}

stage_options_from! {
    Rpm => RpmStageOptions,
    Buildstamp => BuildstampStageOptions,
    Locale => LocaleStageOptions,
    Users => UsersStageOptions,
    Anaconda => AnacondaStageOptions,
    LoraxScript => LoraxScriptStageOptions,
    Dracut => DracutStageOptions,
    SelinuxConfig => SelinuxConfigStageOptions,
    Selinux => SelinuxStageOptions,
    Chmod => ChmodStageOptions,
    OstreeInit => OstreeInitStageOptions,
    OstreePull => OstreePullStageOptions,
    OstreeCommit => OstreeCommitStageOptions,
    NginxConfig => NginxConfigStageOptions,
    Qemu => QemuStageOptions,
    Truncate => TruncateStageOptions,
    Copy => CopyStageOptions,
}
