// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Generic system configuration stages

use serde::Serialize;
use std::collections::BTreeMap;

use super::Stage;

pub const BUILDSTAMP: &str = "org.osbuild.buildstamp";
pub const LOCALE: &str = "org.osbuild.locale";
pub const USERS: &str = "org.osbuild.users";
pub const SELINUX_CONFIG: &str = "org.osbuild.selinux.config";
pub const SELINUX: &str = "org.osbuild.selinux";
pub const CHMOD: &str = "org.osbuild.chmod";

/// Product metadata written to `/.buildstamp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildstampStageOptions {
    pub arch: String,
    pub product: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub version: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleStageOptions {
    pub language: String,
}

/// Users to create or modify, keyed by user name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsersStageOptions {
    pub users: BTreeMap<String, UserOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Password hash; an empty string sets an empty password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelinuxState {
    Enforcing,
    Permissive,
    Disabled,
}

/// SELinux mode written to `/etc/selinux/config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelinuxConfigStageOptions {
    pub state: SelinuxState,
}

/// File labelling according to a policy's file contexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelinuxStageOptions {
    pub file_contexts: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Mode changes, keyed by path inside the tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChmodStageOptions {
    pub items: BTreeMap<String, ChmodPathOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChmodPathOptions {
    /// Symbolic or octal mode, as accepted by chmod(1)
    pub mode: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
}

/// A chmod stage touching a single path
pub fn chmod_stage(path: &str, mode: &str, recursive: bool) -> Stage {
    let mut items = BTreeMap::new();
    items.insert(
        path.to_string(),
        ChmodPathOptions {
            mode: mode.to_string(),
            recursive,
        },
    );
    Stage::new(CHMOD, ChmodStageOptions { items })
}
