// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmanifest contributors

//! Graph command - visualize pipeline dependencies

use miette::Result;
use std::path::PathBuf;

use super::{load_request, GraphFormat};

/// Run the graph command
pub async fn run(request_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let request = load_request(&request_path).await?;
    let composition = request.compose()?;
    let dag = composition.manifest.dag()?;

    let output = match format {
        GraphFormat::Text => dag.to_text(composition.manifest.pipelines())?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
