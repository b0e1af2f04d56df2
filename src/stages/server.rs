// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Web server configuration stages

use serde::Serialize;

pub const NGINX_CONFIG: &str = "org.osbuild.nginx.conf";

/// Write an nginx main config file at `path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NginxConfigStageOptions {
    pub path: String,
    pub config: NginxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NginxConfig {
    pub listen: String,
    pub root: String,
    /// `false` keeps nginx in the foreground
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
}
