// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Build requests
//!
//! A build request names the resolved repositories and package sets and
//! lists the pipelines to build, in dependency order. Pipelines refer to each
//! other by name only.

mod compose;

pub use compose::Composition;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::ComposeResult;
use crate::pipeline::{
    CommitServerConfig, InstallerTreeConfig, OstreeCommitConfig, Qcow2Config, RawImageConfig,
};
use crate::rpmmd::{PackageSpec, RepoConfig};

/// Request file looked up when none is given
pub const DEFAULT_REQUEST_FILE: &str = "osmanifest.yaml";

/// Supported request file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Yaml,
    Toml,
}

impl RequestFormat {
    /// Pick the format from the file extension; YAML unless it ends in `.toml`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// A complete build request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Pipeline the manifest is built for; the last pipeline when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default)]
    pub repositories: Vec<RepoConfig>,

    /// Resolved package lists, by name
    #[serde(default)]
    pub package_sets: BTreeMap<String, Vec<PackageSpec>>,

    pub pipelines: Vec<PipelineRequest>,
}

/// One pipeline of a build request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Overrides the variant's default name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Build pipeline the stages run in; the host when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,

    #[serde(flatten)]
    pub kind: PipelineKind,

    /// Keys no field of the variant accepts; rejected when composing
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

/// Variant-specific part of a pipeline request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PipelineKind {
    Build {
        package_set: String,
    },
    AnacondaTree {
        package_set: String,
        #[serde(flatten)]
        config: InstallerTreeConfig,
    },
    OstreeCommit {
        /// Pipeline whose tree is committed
        tree: String,
        #[serde(flatten)]
        config: OstreeCommitConfig,
    },
    CommitServerTree {
        package_set: String,
        /// The ostree-commit pipeline to serve
        commit: String,
        #[serde(flatten)]
        config: CommitServerConfig,
    },
    RawImage {
        /// Pipeline whose tree is written to the image
        tree: String,
        #[serde(flatten)]
        config: RawImageConfig,
    },
    Qcow2 {
        /// The raw-image pipeline to convert
        image: String,
        #[serde(flatten)]
        config: Qcow2Config,
    },
}

impl PipelineKind {
    /// Name used in requests, e.g. `anaconda-tree`
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Build { .. } => "build",
            Self::AnacondaTree { .. } => "anaconda-tree",
            Self::OstreeCommit { .. } => "ostree-commit",
            Self::CommitServerTree { .. } => "commit-server-tree",
            Self::RawImage { .. } => "raw-image",
            Self::Qcow2 { .. } => "qcow2",
        }
    }

    /// Package set the variant installs, if it installs one
    pub fn package_set(&self) -> Option<&str> {
        match self {
            Self::Build { package_set }
            | Self::AnacondaTree { package_set, .. }
            | Self::CommitServerTree { package_set, .. } => Some(package_set.as_str()),
            _ => None,
        }
    }
}

impl BuildRequest {
    pub fn parse(content: &str, format: RequestFormat) -> ComposeResult<Self> {
        match format {
            RequestFormat::Yaml => Self::from_yaml(content),
            RequestFormat::Toml => Self::from_toml(content),
        }
    }

    pub fn from_yaml(yaml: &str) -> ComposeResult<Self> {
        let request: Self = serde_yaml::from_str(yaml)?;
        request.with_unknown_keys_only()
    }

    pub fn from_toml(toml: &str) -> ComposeResult<Self> {
        let request: Self = toml::from_str(toml)?;
        request.with_unknown_keys_only()
    }

    /// Flattened variants leave every key in the catch-all map; keep only
    /// the ones the variant does not know.
    fn with_unknown_keys_only(mut self) -> ComposeResult<Self> {
        for pipeline in &mut self.pipelines {
            let known = serde_json::to_value(&pipeline.kind)?;
            if let Some(known) = known.as_object() {
                pipeline.unknown.retain(|key, _| !known.contains_key(key));
            }
        }
        Ok(self)
    }

    pub fn to_yaml(&self) -> ComposeResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Name of the pipeline the manifest is built for
    pub fn output_name(&self) -> Option<String> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        self.pipelines.last().map(|p| p.resolved_name().to_string())
    }
}

impl PipelineRequest {
    /// Keys outside the variant's fields
    pub fn unknown_keys(&self) -> ComposeResult<Vec<&str>> {
        let known = serde_json::to_value(&self.kind)?;
        Ok(self
            .unknown
            .keys()
            .filter(|key| known.get(key.as_str()).is_none())
            .map(String::as_str)
            .collect())
    }

    /// Requested name, or the variant's default
    pub fn resolved_name(&self) -> &str {
        use crate::pipeline::defaults;

        if let Some(name) = &self.name {
            return name;
        }
        match self.kind {
            PipelineKind::Build { .. } => defaults::build::NAME,
            PipelineKind::AnacondaTree { .. } => defaults::installer::NAME,
            PipelineKind::OstreeCommit { .. } => defaults::ostree_commit::NAME,
            PipelineKind::CommitServerTree { .. } => defaults::commit_server::NAME,
            PipelineKind::RawImage { .. } => defaults::raw_image::NAME,
            PipelineKind::Qcow2 { .. } => defaults::qcow2::NAME,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A request chaining every variant
    pub const FULL_REQUEST: &str = r#"
repositories:
  - id: fedora
    baseurl: https://example.com/fedora/36
    gpgkey: KEY
    check_gpg: true
package_sets:
  build:
    - { name: rpm, version: "4.17.0", release: "1.fc36", arch: x86_64, remote_location: "https://example.com/rpm.rpm", checksum: "sha256:rpm" }
  installer:
    - { name: kernel, version: "5.17.5", release: "300.fc36", arch: x86_64, remote_location: "https://example.com/kernel.rpm", checksum: "sha256:kernel" }
    - { name: anaconda, version: "36.16.5", release: "1.fc36", arch: x86_64, remote_location: "https://example.com/anaconda.rpm", checksum: "sha256:anaconda" }
  server:
    - { name: nginx, version: "1.20.1", release: "9.fc36", arch: x86_64, remote_location: "https://example.com/nginx.rpm", checksum: "sha256:nginx" }
  unused:
    - { name: vim, version: "8.2", release: "1.fc36", arch: x86_64, remote_location: "https://example.com/vim.rpm", checksum: "sha256:vim" }
pipelines:
  - type: build
    package_set: build
  - type: anaconda-tree
    build: build
    package_set: installer
    kernel: kernel
    arch: x86_64
    product: Fedora
    version: "36"
    users: true
  - type: ostree-commit
    build: build
    tree: anaconda-tree
    ref: fedora/36/x86_64/iot
  - type: commit-server-tree
    build: build
    package_set: server
    commit: ostree-commit
    nginx_config: /etc/nginx.conf
    listen_port: 8080
  - type: raw-image
    build: build
    tree: anaconda-tree
    filename: disk.img
    size: 4294967296
  - type: qcow2
    build: build
    image: image
    filename: disk.qcow2
    compat: "1.1"
"#;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ComposeError;

    #[test]
    fn test_parse_yaml_request() {
        let request = BuildRequest::from_yaml(fixtures::FULL_REQUEST).unwrap();

        assert_eq!(request.repositories[0].id, "fedora");
        assert_eq!(request.package_sets.len(), 4);
        assert_eq!(request.pipelines.len(), 6);
        assert_eq!(request.output_name().as_deref(), Some("qcow2"));

        match &request.pipelines[1].kind {
            PipelineKind::AnacondaTree {
                package_set,
                config,
            } => {
                assert_eq!(package_set, "installer");
                assert_eq!(config.kernel, "kernel");
                assert_eq!(config.version, "36");
                assert!(config.users);
                assert!(!config.biosdevname);
            }
            other => panic!("Expected anaconda tree, got {:?}", other),
        }

        match &request.pipelines[2].kind {
            PipelineKind::OstreeCommit { tree, config } => {
                assert_eq!(tree, "anaconda-tree");
                assert_eq!(config.reference, "fedora/36/x86_64/iot");
            }
            other => panic!("Expected ostree commit, got {:?}", other),
        }
        assert_eq!(request.pipelines[2].build.as_deref(), Some("build"));
    }

    #[test]
    fn test_parse_toml_request() {
        let toml = r#"
output = "tree"

[package_sets]
build = [
  { name = "rpm", version = "4.17.0", release = "1", arch = "x86_64", remote_location = "https://example.com/rpm.rpm", checksum = "sha256:rpm" },
]

[[pipelines]]
type = "build"
package_set = "build"

[[pipelines]]
type = "raw-image"
name = "tree"
build = "build"
tree = "build"
filename = "disk.img"
size = 1024
"#;

        let request = BuildRequest::from_toml(toml).unwrap();
        assert_eq!(request.output.as_deref(), Some("tree"));
        assert_eq!(request.pipelines[1].resolved_name(), "tree");
        assert_eq!(request.pipelines[1].kind.type_name(), "raw-image");
        match &request.pipelines[1].kind {
            PipelineKind::RawImage { config, .. } => assert_eq!(config.size, 1024),
            other => panic!("Expected raw image, got {:?}", other),
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RequestFormat::from_path(Path::new("a.toml")), RequestFormat::Toml);
        assert_eq!(RequestFormat::from_path(Path::new("a.TOML")), RequestFormat::Toml);
        assert_eq!(RequestFormat::from_path(Path::new("a.yml")), RequestFormat::Yaml);
        assert_eq!(RequestFormat::from_path(Path::new("osmanifest")), RequestFormat::Yaml);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = "pipelines:\n  - type: vmdk\n    filename: disk.vmdk\n";
        assert!(matches!(
            BuildRequest::from_yaml(yaml),
            Err(ComposeError::Yaml { .. })
        ));
    }

    #[test]
    fn test_known_keys_are_not_left_over() {
        let request = BuildRequest::from_yaml(fixtures::FULL_REQUEST).unwrap();
        for pipeline in &request.pipelines {
            assert!(
                pipeline.unknown.is_empty(),
                "{} kept {:?}",
                pipeline.resolved_name(),
                pipeline.unknown.keys().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_misspelled_key_is_kept() {
        let yaml = fixtures::FULL_REQUEST.replace("users: true", "users: true\n    biosdevnam: true");
        let request = BuildRequest::from_yaml(&yaml).unwrap();

        let keys: Vec<&str> = request.pipelines[1].unknown.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["biosdevnam"]);
        assert!(request.pipelines[0].unknown.is_empty());
    }

    #[test]
    fn test_misspelled_toml_key_is_kept() {
        let toml = r#"
[[pipelines]]
type = "build"
package_set = "build"
pakage_set = "other"
"#;
        let request = BuildRequest::from_toml(toml).unwrap();
        assert!(request.pipelines[0].unknown.contains_key("pakage_set"));
    }

    #[test]
    fn test_default_names() {
        let request = BuildRequest::from_yaml(fixtures::FULL_REQUEST).unwrap();
        let names: Vec<&str> = request.pipelines.iter().map(|p| p.resolved_name()).collect();
        assert_eq!(
            names,
            vec!["build", "anaconda-tree", "ostree-commit", "container-tree", "image", "qcow2"]
        );
    }
}
