// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Commit server tree pipeline
//!
//! An nginx tree serving an embedded ostree commit. The tree is meant to run
//! as an unprivileged container, which shapes the permission and nginx
//! configuration stages.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BuildPipeline, CommitSource, Pipeline, PipelineVariant, SerializedPipeline};
use crate::errors::{ComposeError, ComposeResult};
use crate::rpmmd::{find_package, PackageSpec, RepoConfig};
use crate::stages::{
    chmod_stage, rpm_stage, LocaleStageOptions, NginxConfig, NginxConfigStageOptions,
    OstreeInitStageOptions, OstreePullStageOptions, Stage, StageInput, LOCALE, NGINX_CONFIG,
    OSTREE_INIT, OSTREE_PULL,
};

pub mod defaults {
    pub const NAME: &str = "container-tree";
    pub const WEB_SERVER_PACKAGE: &str = "nginx";
    pub const LANGUAGE: &str = "en_US";
    pub const HTML_ROOT: &str = "/usr/share/nginx/html";
    /// Repository directory below [`HTML_ROOT`]
    pub const REPO_DIR: &str = "repo";
    /// Must stay outside the relaxed directories and be writable by anyone
    pub const PID_FILE: &str = "/tmp/nginx.pid";
    /// Directories nginx writes to at runtime, relaxed in this order
    pub const WRITABLE_DIRS: [&str; 2] = ["/var/log/nginx", "/var/lib/nginx"];
    pub const WRITABLE_MODE: &str = "a+rwX";
}

/// Parameters of a commit server tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitServerConfig {
    /// Path of the main nginx config file inside the tree
    pub nginx_config: String,

    /// Port nginx listens on
    pub listen_port: u16,
}

/// An nginx server tree with an embedded ostree commit
#[derive(Debug, Clone)]
pub struct CommitServerTreePipeline {
    base: Pipeline,
    repos: Vec<RepoConfig>,
    packages: Vec<PackageSpec>,
    commit_pipeline: String,
    commit_ref: String,
    config: CommitServerConfig,
}

impl CommitServerTreePipeline {
    /// Create a commit server tree pipeline
    ///
    /// `packages` must contain nginx. `commit` is the pipeline producing the
    /// commit to serve; only its name and ref are kept.
    pub fn new(
        build: Option<&BuildPipeline>,
        repos: &[RepoConfig],
        packages: &[PackageSpec],
        commit: &dyn CommitSource,
        config: CommitServerConfig,
    ) -> ComposeResult<Self> {
        let name = defaults::NAME;

        if find_package(packages, defaults::WEB_SERVER_PACKAGE).is_none() {
            return Err(ComposeError::missing_package(name, defaults::WEB_SERVER_PACKAGE));
        }
        ComposeError::require_non_empty(name, "commit ref", commit.commit_ref())?;
        ComposeError::require_non_empty(name, "nginx_config", &config.nginx_config)?;
        if !config.nginx_config.starts_with('/') {
            return Err(ComposeError::invalid_option(
                name,
                "nginx_config",
                format!("'{}' is not an absolute path", config.nginx_config),
            ));
        }
        if config.listen_port == 0 {
            return Err(ComposeError::invalid_option(name, "listen_port", "port 0 cannot be listened on"));
        }

        debug!(commit = %commit.name(), commit_ref = %commit.commit_ref(), "serving commit");

        Ok(Self {
            base: Pipeline::new(name, build, None),
            repos: repos.to_vec(),
            packages: packages.to_vec(),
            commit_pipeline: commit.name().to_string(),
            commit_ref: commit.commit_ref().to_string(),
            config,
        })
    }

    /// Use a different pipeline name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.base.rename(name);
        self
    }

    /// Where the commit is pulled to, inside the web root
    pub fn repo_path() -> String {
        format!("{}/{}", defaults::HTML_ROOT, defaults::REPO_DIR)
    }

    pub fn config(&self) -> &CommitServerConfig {
        &self.config
    }

    fn nginx_config_stage(&self) -> Stage {
        Stage::new(
            NGINX_CONFIG,
            NginxConfigStageOptions {
                path: self.config.nginx_config.clone(),
                config: NginxConfig {
                    listen: self.config.listen_port.to_string(),
                    root: defaults::HTML_ROOT.to_string(),
                    daemon: Some(false),
                    pid: Some(defaults::PID_FILE.to_string()),
                },
            },
        )
    }
}

impl PipelineVariant for CommitServerTreePipeline {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn serialize(&self) -> SerializedPipeline {
        let mut pipeline = self.base.serialize();
        let repo_path = Self::repo_path();

        pipeline.add_stage(rpm_stage(&self.repos, &self.packages));
        pipeline.add_stage(Stage::new(
            LOCALE,
            LocaleStageOptions {
                language: defaults::LANGUAGE.to_string(),
            },
        ));
        pipeline.add_stage(Stage::new(
            OSTREE_INIT,
            OstreeInitStageOptions {
                path: repo_path.clone(),
            },
        ));
        pipeline.add_stage(
            Stage::new(
                OSTREE_PULL,
                OstreePullStageOptions {
                    repo: repo_path,
                },
            )
            .with_input(
                "commits",
                StageInput::pipeline(&self.commit_pipeline, &self.commit_ref),
            ),
        );

        for dir in defaults::WRITABLE_DIRS {
            pipeline.add_stage(chmod_stage(dir, defaults::WRITABLE_MODE, true));
        }

        pipeline.add_stage(self.nginx_config_stage());

        pipeline
    }
}
