// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Disk image stages

use serde::Serialize;

pub const QEMU: &str = "org.osbuild.qemu";
pub const TRUNCATE: &str = "org.osbuild.truncate";
pub const COPY: &str = "org.osbuild.copy";

/// Convert the `image` input into another on-disk format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QemuStageOptions {
    pub filename: String,
    pub format: QemuFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QemuFormat {
    Qcow2 {
        /// qcow2 compatibility level, `0.10` or `1.1`
        #[serde(skip_serializing_if = "Option::is_none")]
        compat: Option<String>,
    },
}

/// Create (or resize) a sparse file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncateStageOptions {
    pub filename: String,
    /// Size in bytes, as a decimal string
    pub size: String,
}

/// Copy trees between inputs and mounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyStageOptions {
    pub paths: Vec<CopyPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyPath {
    pub from: String,
    pub to: String,
}
