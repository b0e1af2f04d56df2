// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! OSTree repository stages

use serde::Serialize;

pub const OSTREE_INIT: &str = "org.osbuild.ostree.init";
pub const OSTREE_PULL: &str = "org.osbuild.ostree.pull";
pub const OSTREE_COMMIT: &str = "org.osbuild.ostree.commit";

/// Create an empty repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OstreeInitStageOptions {
    pub path: String,
}

/// Pull commits from the `commits` input into a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OstreePullStageOptions {
    pub repo: String,
}

/// Commit the `tree` input under a ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OstreeCommitStageOptions {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}
