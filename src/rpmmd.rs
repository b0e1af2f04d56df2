// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Resolved package metadata
//!
//! Repositories and package specs arrive fully resolved from a depsolver.
//! They are only read here, never modified.

use serde::{Deserialize, Serialize};

/// A package repository as seen by the depsolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Repository identifier
    pub id: String,

    /// Base URL of the repository
    #[serde(default)]
    pub baseurl: Option<String>,

    /// Metalink URL
    #[serde(default)]
    pub metalink: Option<String>,

    /// Mirrorlist URL
    #[serde(default)]
    pub mirrorlist: Option<String>,

    /// ASCII-armored GPG key used to verify packages from this repository
    #[serde(default)]
    pub gpgkey: Option<String>,

    /// Verify package signatures
    #[serde(default)]
    pub check_gpg: bool,

    /// Skip TLS verification when fetching
    #[serde(default)]
    pub ignore_ssl: bool,
}

/// A single resolved package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub epoch: u32,
    pub version: String,
    pub release: String,
    pub arch: String,
    /// Where the package file can be downloaded from
    pub remote_location: String,
    /// Content checksum, e.g. `sha256:...`
    pub checksum: String,
    #[serde(default)]
    pub check_gpg: bool,
}

impl PackageSpec {
    /// `version-release.arch`, the form the kernel uses for its module directory
    pub fn version_string(&self) -> String {
        format!("{}-{}.{}", self.version, self.release, self.arch)
    }
}

/// Find a package by name
pub fn find_package<'a>(packages: &'a [PackageSpec], name: &str) -> Option<&'a PackageSpec> {
    packages.iter().find(|p| p.name == name)
}

/// Version string of the named package, if it was resolved
pub fn version_string_of(packages: &[PackageSpec], name: &str) -> Option<String> {
    find_package(packages, name).map(PackageSpec::version_string)
}

/// GPG keys of all repositories that carry one, in repository order
pub fn gpg_keys(repos: &[RepoConfig]) -> Vec<String> {
    repos
        .iter()
        .filter_map(|r| r.gpgkey.as_deref())
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::{package, repo};
    use super::*;

    #[test]
    fn test_version_string_of_kernel() {
        let packages = vec![package("bash", "5.1"), package("kernel", "5.17.5")];

        assert_eq!(
            version_string_of(&packages, "kernel").as_deref(),
            Some("5.17.5-1.fc36.x86_64")
        );
        assert!(version_string_of(&packages, "kernel-rt").is_none());
    }

    #[test]
    fn test_gpg_keys_skips_repos_without_keys() {
        let repos = vec![
            repo("baseos", Some("KEY-A")),
            repo("extras", None),
            repo("appstream", Some("KEY-B")),
        ];

        assert_eq!(gpg_keys(&repos), vec!["KEY-A", "KEY-B"]);
    }

    #[test]
    fn test_parse_package_spec_yaml() {
        let yaml = r#"
name: nginx
version: "1.20.1"
release: "2.fc36"
arch: x86_64
remote_location: https://example.com/nginx.rpm
checksum: "sha256:abc"
"#;

        let spec: PackageSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.epoch, 0);
        assert!(!spec.check_gpg);
        assert_eq!(spec.version_string(), "1.20.1-2.fc36.x86_64");
    }
}
