// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Installer tree pipeline
//!
//! Builds the installer root filesystem as found on an install ISO: the
//! installer packages, product metadata, the `install` service account,
//! and an initramfs able to boot the installer from any supported media.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{BuildPipeline, Pipeline, PipelineVariant, SerializedPipeline};
use crate::errors::{ComposeError, ComposeResult};
use crate::rpmmd::{version_string_of, PackageSpec, RepoConfig};
use crate::stages::{
    rpm_stage, AnacondaStageOptions, BuildstampStageOptions, DracutStageOptions,
    LocaleStageOptions, LoraxScriptStageOptions, SelinuxConfigStageOptions, Stage,
    UserOptions, UsersStageOptions, ANACONDA, BUILDSTAMP, DRACUT, LOCALE, LORAX_SCRIPT,
    SELINUX_CONFIG, USERS,
};

pub mod defaults {
    use crate::stages::SelinuxState;

    pub const NAME: &str = "anaconda-tree";
    pub const LOCALE: &str = "en_US.UTF-8";
    pub const SELINUX_STATE: SelinuxState = SelinuxState::Permissive;

    pub const ROOT_USER: &str = "root";
    pub const INSTALL_USER: &str = "install";
    pub const INSTALL_UID: u32 = 0;
    pub const INSTALL_GID: u32 = 0;
    pub const INSTALL_HOME: &str = "/root";
    pub const INSTALL_SHELL: &str = "/usr/libexec/anaconda/run-anaconda";

    pub const POSTINSTALL_TEMPLATE: &str = "99-generic/runtime-postinstall.tmpl";
    /// Written by the buildstamp stage, read by the installer at boot
    pub const BUILDSTAMP_FILE: &str = "/.buildstamp";

    pub const BIOSDEVNAME_MODULE: &str = "biosdevname";

    /// Dracut modules every installer initramfs carries
    pub const BASE_DRACUT_MODULES: [&str; 37] = [
        "bash",
        "systemd",
        "fips",
        "systemd-initrd",
        "modsign",
        "nss-softokn",
        "i18n",
        "convertfs",
        "network-manager",
        "network",
        "ifcfg",
        "url-lib",
        "drm",
        "plymouth",
        "crypt",
        "dm",
        "dmsquash-live",
        "kernel-modules",
        "kernel-modules-extra",
        "kernel-network-modules",
        "livenet",
        "lvm",
        "mdraid",
        "qemu",
        "qemu-net",
        "resume",
        "rootfs-block",
        "terminfo",
        "udev-rules",
        "dracut-systemd",
        "pollcdrom",
        "usrmount",
        "base",
        "fs-lib",
        "img-lib",
        "shutdown",
        "uefi-lib",
    ];

    /// Installer-specific dracut modules, added after the base set
    pub const INSTALLER_DRACUT_MODULES: [&str; 9] = [
        "anaconda",
        "rdma",
        "rngd",
        "multipath",
        "fcoe",
        "fcoe-uefi",
        "iscsi",
        "lunmask",
        "nfs",
    ];
}

/// Parameters of an installer tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerTreeConfig {
    /// Name of the kernel package the installer boots
    pub kernel: String,

    /// Supported architecture
    pub arch: String,

    /// Product the installer installs
    pub product: String,

    /// Version of the product
    pub version: String,

    /// Product variant, if any
    #[serde(default)]
    pub variant: Option<String>,

    /// Enable the user configuration spoke. When off, kickstart users are
    /// ignored and nobody is prompted for users at install time.
    #[serde(default)]
    pub users: bool,

    /// Name network devices with biosdevname when booting the installer
    #[serde(default)]
    pub biosdevname: bool,
}

/// The installer tree as found on an ISO
#[derive(Debug, Clone)]
pub struct AnacondaTreePipeline {
    base: Pipeline,
    repos: Vec<RepoConfig>,
    packages: Vec<PackageSpec>,
    kernel_version: String,
    config: InstallerTreeConfig,
}

impl AnacondaTreePipeline {
    /// Create an installer tree pipeline
    ///
    /// `repos` and `packages` are the content of the installer itself, not
    /// what it installs. Fails when `packages` lacks the configured kernel:
    /// the initramfs is built for that exact kernel version.
    pub fn new(
        build: Option<&BuildPipeline>,
        repos: &[RepoConfig],
        packages: &[PackageSpec],
        config: InstallerTreeConfig,
    ) -> ComposeResult<Self> {
        for (option, value) in [
            ("kernel", &config.kernel),
            ("arch", &config.arch),
            ("product", &config.product),
            ("version", &config.version),
        ] {
            ComposeError::require_non_empty(defaults::NAME, option, value)?;
        }

        let kernel_version = version_string_of(packages, &config.kernel)
            .ok_or_else(|| ComposeError::missing_package(defaults::NAME, &config.kernel))?;
        debug!(kernel = %config.kernel, version = %kernel_version, "resolved installer kernel");

        Ok(Self {
            base: Pipeline::new(defaults::NAME, build, None),
            repos: repos.to_vec(),
            packages: packages.to_vec(),
            kernel_version,
            config,
        })
    }

    /// Use a different pipeline name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.base.rename(name);
        self
    }

    /// `version-release.arch` of the kernel the installer boots
    pub fn kernel_version(&self) -> &str {
        &self.kernel_version
    }

    pub fn arch(&self) -> &str {
        &self.config.arch
    }

    pub fn product(&self) -> &str {
        &self.config.product
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &InstallerTreeConfig {
        &self.config
    }

    /// `root` and `install` both get an empty password, as on the installer
    /// image; neither account is locked.
    fn users_stage() -> Stage {
        let root = UserOptions {
            password: Some(String::new()),
            ..Default::default()
        };
        let install = UserOptions {
            uid: Some(defaults::INSTALL_UID),
            gid: Some(defaults::INSTALL_GID),
            home: Some(defaults::INSTALL_HOME.to_string()),
            shell: Some(defaults::INSTALL_SHELL.to_string()),
            password: Some(String::new()),
        };

        let mut users = BTreeMap::new();
        users.insert(defaults::ROOT_USER.to_string(), root);
        users.insert(defaults::INSTALL_USER.to_string(), install);
        Stage::new(USERS, UsersStageOptions { users })
    }
}

/// Initramfs modules: the base set, biosdevname when requested, then the
/// installer modules. Duplicates are kept.
pub fn dracut_modules(biosdevname: bool) -> Vec<String> {
    let biosdevname_module = biosdevname.then_some(defaults::BIOSDEVNAME_MODULE);

    defaults::BASE_DRACUT_MODULES
        .iter()
        .copied()
        .chain(biosdevname_module)
        .chain(defaults::INSTALLER_DRACUT_MODULES.iter().copied())
        .map(String::from)
        .collect()
}

impl PipelineVariant for AnacondaTreePipeline {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn serialize(&self) -> SerializedPipeline {
        let mut pipeline = self.base.serialize();

        pipeline.add_stage(rpm_stage(&self.repos, &self.packages));
        pipeline.add_stage(Stage::new(
            BUILDSTAMP,
            BuildstampStageOptions {
                arch: self.config.arch.clone(),
                product: self.config.product.clone(),
                variant: self.config.variant.clone(),
                version: self.config.version.clone(),
                is_final: true,
            },
        ));
        pipeline.add_stage(Stage::new(
            LOCALE,
            LocaleStageOptions {
                language: defaults::LOCALE.to_string(),
            },
        ));
        pipeline.add_stage(Self::users_stage());
        pipeline.add_stage(Stage::new(ANACONDA, AnacondaStageOptions::new(self.config.users)));
        pipeline.add_stage(Stage::new(
            LORAX_SCRIPT,
            LoraxScriptStageOptions {
                path: defaults::POSTINSTALL_TEMPLATE.to_string(),
                basearch: self.config.arch.clone(),
            },
        ));
        pipeline.add_stage(Stage::new(
            DRACUT,
            DracutStageOptions {
                kernel: vec![self.kernel_version.clone()],
                modules: dracut_modules(self.config.biosdevname),
                install: vec![defaults::BUILDSTAMP_FILE.to_string()],
            },
        ));
        pipeline.add_stage(Stage::new(
            SELINUX_CONFIG,
            SelinuxConfigStageOptions {
                state: defaults::SELINUX_STATE,
            },
        ));

        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpmmd::fixtures::{package, repo};
    use crate::stages::{StageOptions, RPM};

    fn config() -> InstallerTreeConfig {
        InstallerTreeConfig {
            kernel: "kernel".into(),
            arch: "x86_64".into(),
            product: "Fedora".into(),
            version: "36".into(),
            variant: Some("Server".into()),
            users: false,
            biosdevname: false,
        }
    }

    fn installer(config: InstallerTreeConfig) -> AnacondaTreePipeline {
        let build = BuildPipeline::new(&[], &[package("coreutils", "9.0")]).unwrap();
        let packages = vec![package("anaconda", "36.16"), package("kernel", "5.17.5")];
        AnacondaTreePipeline::new(Some(&build), &[repo("fedora", Some("KEY"))], &packages, config)
            .unwrap()
    }

    fn dracut_options(pipeline: &SerializedPipeline) -> DracutStageOptions {
        match &pipeline.stages[pipeline.stage_index(DRACUT).unwrap()].options {
            Some(StageOptions::Dracut(options)) => options.clone(),
            other => panic!("Expected dracut options, got {:?}", other),
        }
    }

    #[test]
    fn test_stage_order() {
        let serialized = installer(config()).serialize();
        let kinds: Vec<&str> = serialized.stages.iter().map(|s| s.kind.as_str()).collect();

        assert_eq!(
            kinds,
            vec![RPM, BUILDSTAMP, LOCALE, USERS, ANACONDA, LORAX_SCRIPT, DRACUT, SELINUX_CONFIG]
        );
        assert!(serialized.stage_index(BUILDSTAMP) < serialized.stage_index(ANACONDA));
        assert_eq!(serialized.name, "anaconda-tree");
        assert_eq!(serialized.build.as_deref(), Some("build"));
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let pipeline = installer(config());
        let first = serde_json::to_string(&pipeline.serialize()).unwrap();
        let second = serde_json::to_string(&pipeline.serialize()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dracut_modules_without_biosdevname() {
        let options = dracut_options(&installer(config()).serialize());

        let expected: Vec<String> = defaults::BASE_DRACUT_MODULES
            .iter()
            .chain(defaults::INSTALLER_DRACUT_MODULES.iter())
            .map(|m| m.to_string())
            .collect();
        assert_eq!(options.modules, expected);
        assert_eq!(options.kernel, vec!["5.17.5-1.fc36.x86_64"]);
        assert_eq!(options.install, vec!["/.buildstamp"]);
    }

    #[test]
    fn test_dracut_modules_with_biosdevname() {
        let options = dracut_options(
            &installer(InstallerTreeConfig {
                biosdevname: true,
                ..config()
            })
            .serialize(),
        );

        assert_eq!(options.modules.len(), 37 + 1 + 9);
        assert_eq!(options.modules[37], "biosdevname");
        assert_eq!(options.modules[36], "uefi-lib");
        assert_eq!(options.modules[38], "anaconda");
        assert_eq!(options.modules.last().map(String::as_str), Some("nfs"));
    }

    #[test]
    fn test_dracut_modules_concatenation() {
        let modules = dracut_modules(true);
        let base = defaults::BASE_DRACUT_MODULES.len();

        assert!(modules[..base]
            .iter()
            .zip(defaults::BASE_DRACUT_MODULES.iter())
            .all(|(a, b)| a == b));
        assert!(modules[base + 1..]
            .iter()
            .zip(defaults::INSTALLER_DRACUT_MODULES.iter())
            .all(|(a, b)| a == b));
        assert_eq!(modules.iter().filter(|m| *m == "biosdevname").count(), 1);
    }

    #[test]
    fn test_fixed_literals() {
        let serialized = installer(config()).serialize();

        match &serialized.stages[serialized.stage_index(USERS).unwrap()].options {
            Some(StageOptions::Users(options)) => {
                let root = &options.users["root"];
                assert_eq!(root.password.as_deref(), Some(""));
                assert_eq!(root.uid, None);

                let install = &options.users["install"];
                assert_eq!(install.uid, Some(0));
                assert_eq!(install.gid, Some(0));
                assert_eq!(install.password.as_deref(), Some(""));
                assert_eq!(install.home.as_deref(), Some("/root"));
                assert_eq!(
                    install.shell.as_deref(),
                    Some("/usr/libexec/anaconda/run-anaconda")
                );
            }
            other => panic!("Expected users options, got {:?}", other),
        }

        let value = serde_json::to_value(&serialized).unwrap();
        assert_eq!(value["stages"][3]["options"]["users"]["root"], serde_json::json!({"password": ""}));
        assert_eq!(value["stages"][2]["options"]["language"], "en_US.UTF-8");
        assert_eq!(value["stages"][7]["options"]["state"], "permissive");
        assert_eq!(value["stages"][1]["options"]["final"], true);
        assert_eq!(value["stages"][1]["options"]["variant"], "Server");
        assert_eq!(
            value["stages"][5]["options"]["path"],
            "99-generic/runtime-postinstall.tmpl"
        );
        assert_eq!(value["stages"][5]["options"]["basearch"], "x86_64");
    }

    #[test]
    fn test_users_flag_controls_anaconda_modules() {
        let serialized = installer(InstallerTreeConfig {
            users: true,
            ..config()
        })
        .serialize();

        match &serialized.stages[serialized.stage_index(ANACONDA).unwrap()].options {
            Some(StageOptions::Anaconda(options)) => {
                assert_eq!(options, &AnacondaStageOptions::new(true));
            }
            other => panic!("Expected anaconda options, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_kernel_fails_construction() {
        let packages = vec![package("anaconda", "36.16")];
        let result = AnacondaTreePipeline::new(None, &[], &packages, config());

        match result {
            Err(ComposeError::MissingPackage { pipeline, package }) => {
                assert_eq!(pipeline, "anaconda-tree");
                assert_eq!(package, "kernel");
            }
            other => panic!("Expected missing package error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_arch_rejected() {
        let packages = vec![package("kernel", "5.17.5")];
        let result = AnacondaTreePipeline::new(
            None,
            &[],
            &packages,
            InstallerTreeConfig {
                arch: String::new(),
                ..config()
            },
        );
        assert!(matches!(result, Err(ComposeError::InvalidOption { .. })));
    }

    #[test]
    fn test_accessors() {
        let pipeline = installer(config()).named("installer");
        assert_eq!(pipeline.name(), "installer");
        assert_eq!(pipeline.kernel_version(), "5.17.5-1.fc36.x86_64");
        assert_eq!(pipeline.arch(), "x86_64");
        assert_eq!(pipeline.product(), "Fedora");
        assert_eq!(pipeline.version(), "36");
        assert_eq!(pipeline.reference(), None);
    }
}
