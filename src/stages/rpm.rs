// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Package installation stage

use serde::Serialize;

use super::{Stage, StageInput};
use crate::rpmmd::{gpg_keys, PackageSpec, RepoConfig};

pub const RPM: &str = "org.osbuild.rpm";

/// Options for `org.osbuild.rpm`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RpmStageOptions {
    /// Keys imported before installing, so signatures can be checked
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpgkeys: Vec<String>,
}

impl RpmStageOptions {
    pub fn new(repos: &[RepoConfig]) -> Self {
        Self {
            gpgkeys: gpg_keys(repos),
        }
    }
}

/// Install `packages` into the tree; the package files are referenced by checksum
pub fn rpm_stage(repos: &[RepoConfig], packages: &[PackageSpec]) -> Stage {
    let checksums = packages.iter().map(|p| p.checksum.clone()).collect();

    Stage::new(RPM, RpmStageOptions::new(repos))
        .with_input("packages", StageInput::source(checksums))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpmmd::fixtures::{package, repo};

    #[test]
    fn test_rpm_stage_references_packages_in_order() {
        let packages = vec![package("kernel", "5.17"), package("bash", "5.1")];
        let stage = rpm_stage(&[repo("baseos", Some("KEY"))], &packages);

        assert_eq!(stage.kind, RPM);
        assert_eq!(
            stage.input("packages").unwrap().source_references(),
            ["sha256:kernel5.17".to_string(), "sha256:bash5.1".to_string()]
        );
        assert_eq!(stage.upstream_pipelines().count(), 0);
    }
}
