// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Installer runtime stages

use serde::Serialize;

pub const ANACONDA: &str = "org.osbuild.anaconda";
pub const LORAX_SCRIPT: &str = "org.osbuild.lorax-script";
pub const DRACUT: &str = "org.osbuild.dracut";

const KICKSTART_MODULES: [&str; 3] = [
    "org.fedoraproject.Anaconda.Modules.Network",
    "org.fedoraproject.Anaconda.Modules.Payloads",
    "org.fedoraproject.Anaconda.Modules.Storage",
];

const USERS_KICKSTART_MODULE: &str = "org.fedoraproject.Anaconda.Modules.Users";

/// Anaconda configuration: which kickstart modules (spokes) are active
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnacondaStageOptions {
    #[serde(rename = "kickstart-modules")]
    pub kickstart_modules: Vec<String>,
}

impl AnacondaStageOptions {
    /// Enable the default modules, plus the user module when `users` is set
    pub fn new(users: bool) -> Self {
        let mut kickstart_modules: Vec<String> =
            KICKSTART_MODULES.iter().map(|m| m.to_string()).collect();
        if users {
            kickstart_modules.push(USERS_KICKSTART_MODULE.to_string());
        }
        Self { kickstart_modules }
    }
}

/// A lorax template run against the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoraxScriptStageOptions {
    pub path: String,
    pub basearch: String,
}

/// Initramfs generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DracutStageOptions {
    /// Kernel versions to build an initramfs for
    pub kernel: Vec<String>,
    /// Dracut modules, in the order dracut should add them
    pub modules: Vec<String>,
    /// Extra files copied into the initramfs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub install: Vec<String>,
}
