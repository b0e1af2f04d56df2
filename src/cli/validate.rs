// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Validate command - check a build request

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_request;
use crate::pipeline::PipelineVariant;

/// Run the validate command
pub async fn run(request_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating build request...".bold());
    println!();

    let request = match load_request(&request_path).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("  {} Failed to load build request", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Request file parsed", "✓".green());

    let composition = match request.compose() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  {} Failed to construct pipelines", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!(
        "  {} {} pipelines constructed",
        "✓".green(),
        composition.pipelines.len()
    );

    let validation = composition.validate();

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Request summary".bold());
        println!("  Output: {}", composition.output);
        println!("  Pipelines: {}", composition.pipelines.len());
        for (pipeline, serialized) in composition
            .pipelines
            .iter()
            .zip(composition.manifest.pipelines())
        {
            let deps = serialized.dependencies();
            let deps = if deps.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", deps.join(", "))
            };
            println!(
                "    - {} ({}, {} stages){}",
                pipeline.name(),
                pipeline.kind(),
                serialized.stages.len(),
                deps.dimmed()
            );
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Build request validation failed"));
    }

    if validation.has_warnings() {
        println!("{}", "Build request is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Build request is valid!".green().bold());
    }

    Ok(())
}
