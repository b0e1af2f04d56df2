// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Manifest validation
//!
//! Reports every problem of a manifest at once instead of stopping at the
//! first one, as assembly does.

use std::collections::{HashMap, HashSet};

use super::{Manifest, ManifestDag};
use crate::errors::ComposeError;

/// Manifest validator
pub struct ManifestValidator;

impl ManifestValidator {
    /// Validate the pipelines of a manifest, optionally against an output
    pub fn validate(manifest: &Manifest, output: Option<&str>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let pipelines = manifest.pipelines();

        if pipelines.is_empty() {
            result.add_error("Manifest has no pipelines");
            return result;
        }

        // Names
        let mut seen = HashMap::new();
        for (idx, pipeline) in pipelines.iter().enumerate() {
            if pipeline.name.trim().is_empty() {
                result.add_error(&format!("Pipeline #{} has an empty name", idx + 1));
                continue;
            }
            if seen.insert(pipeline.name.as_str(), idx).is_some() {
                result.add_error(&format!("Duplicate pipeline name: '{}'", pipeline.name));
            }
        }

        // References
        for pipeline in pipelines {
            for dep in pipeline.dependencies() {
                if !seen.contains_key(dep) {
                    result.add_error(&format!(
                        "Pipeline '{}' references unknown pipeline '{}'",
                        pipeline.name, dep
                    ));
                }
            }

            let missing: HashSet<&str> = pipeline
                .source_references()
                .filter(|checksum| manifest.source_url(checksum).is_none())
                .collect();
            let mut missing: Vec<&str> = missing.into_iter().collect();
            missing.sort_unstable();
            for checksum in missing {
                result.add_error(&format!(
                    "Pipeline '{}' uses '{}', which no package set provides",
                    pipeline.name, checksum
                ));
            }

            if pipeline.stages.is_empty() {
                result.add_warning(&format!("Pipeline '{}' has no stages", pipeline.name));
            }
        }

        if let Some(name) = output {
            if !seen.contains_key(name) {
                result.add_error(&format!("Requested output '{}' is not a pipeline", name));
            }
        }

        // Name and reference errors would only be repeated by the DAG
        if !result.is_valid() {
            return result;
        }

        match ManifestDag::build(pipelines) {
            Ok(dag) => {
                if let Some(name) = output {
                    Self::check_reachability(&dag, name, manifest, &mut result);
                }
            }
            Err(ComposeError::CircularDependency { pipelines }) => {
                result.add_error(&format!("Circular dependency: {}", pipelines.join(" -> ")));
            }
            Err(e) => {
                result.add_error(&format!("DAG validation error: {}", e));
            }
        }

        result
    }

    /// Warn about pipelines the output never uses
    fn check_reachability(
        dag: &ManifestDag,
        output: &str,
        manifest: &Manifest,
        result: &mut ValidationResult,
    ) {
        let Ok(closure) = dag.closure(output) else {
            return;
        };

        for (idx, pipeline) in manifest.pipelines().iter().enumerate() {
            if !closure.contains(&idx) {
                result.add_warning(&format!(
                    "Pipeline '{}' is not needed by '{}' and will be left out",
                    pipeline.name, output
                ));
            }
        }
    }
}

/// Result of manifest validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
