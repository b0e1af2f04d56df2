// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Error types for pipeline composition
//!
//! Every failure here is a caller or configuration defect: composition is a
//! pure transformation, so nothing is retried.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for osmanifest operations
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Main error type for osmanifest
#[derive(Error, Debug, Diagnostic)]
pub enum ComposeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline '{pipeline}' requires package '{package}', which is not in its package set")]
    #[diagnostic(
        code(osmanifest::missing_package),
        help("Add '{package}' to the package set resolved for '{pipeline}'")
    )]
    MissingPackage { pipeline: String, package: String },

    #[error("Pipeline '{pipeline}': invalid {option}: {reason}")]
    #[diagnostic(code(osmanifest::invalid_option))]
    InvalidOption {
        pipeline: String,
        option: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Assembly Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline name '{name}' is used more than once")]
    #[diagnostic(
        code(osmanifest::duplicate_pipeline),
        help("Give one of the pipelines a distinct name")
    )]
    DuplicatePipeline { name: String },

    #[error("Pipeline '{pipeline}' references unknown pipeline '{reference}'")]
    #[diagnostic(
        code(osmanifest::unknown_pipeline),
        help("Check that '{reference}' is part of the same build request")
    )]
    UnknownPipeline { pipeline: String, reference: String },

    #[error("Pipeline '{pipeline}' cannot use '{reference}': expected {expected}")]
    #[diagnostic(code(osmanifest::incompatible_reference))]
    IncompatibleReference {
        pipeline: String,
        reference: String,
        expected: String,
    },

    #[error("Circular dependency detected between pipelines: {}", pipelines.join(", "))]
    #[diagnostic(
        code(osmanifest::circular_dependency),
        help("Review the build and input references to remove the cycle")
    )]
    CircularDependency { pipelines: Vec<String> },

    #[error("Requested output pipeline '{name}' does not exist")]
    #[diagnostic(code(osmanifest::unknown_output))]
    UnknownOutput { name: String },

    #[error("Invalid pipeline: {reason}")]
    #[diagnostic(code(osmanifest::invalid_pipeline))]
    InvalidPipeline { reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Build request file not found: {path}")]
    #[diagnostic(
        code(osmanifest::request_not_found),
        help("Pass the request file explicitly or create osmanifest.yaml")
    )]
    RequestNotFound { path: PathBuf },

    #[error("Invalid build request: {reason}")]
    #[diagnostic(code(osmanifest::invalid_request))]
    InvalidRequest {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline '{pipeline}' uses unknown package set '{name}'")]
    #[diagnostic(code(osmanifest::unknown_package_set))]
    UnknownPackageSet { pipeline: String, name: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(osmanifest::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(osmanifest::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(osmanifest::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(osmanifest::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(osmanifest::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(osmanifest::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for ComposeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for ComposeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for ComposeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for ComposeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl ComposeError {
    /// Create an invalid option error for a pipeline
    pub fn invalid_option(pipeline: &str, option: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            pipeline: pipeline.to_string(),
            option: option.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a missing package error for a pipeline
    pub fn missing_package(pipeline: &str, package: &str) -> Self {
        Self::MissingPackage {
            pipeline: pipeline.to_string(),
            package: package.to_string(),
        }
    }

    /// Fail with an invalid option error when `value` is empty
    pub fn require_non_empty(pipeline: &str, option: &str, value: &str) -> ComposeResult<()> {
        if value.trim().is_empty() {
            return Err(Self::invalid_option(pipeline, option, "must not be empty"));
        }
        Ok(())
    }
}
