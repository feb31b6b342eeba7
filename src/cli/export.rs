// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Export command - re-emit a pipeline as normalized YAML

use miette::Result;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::utils::print_success;

/// Run the export command
pub async fn run(pipeline_path: PathBuf, output: Option<PathBuf>, _verbose: bool) -> Result<()> {
    let config = PipelineConfig::from_file(&pipeline_path)?;

    match output {
        Some(path) => {
            config.to_file(&path)?;
            print_success(&format!("Exported '{}' to {}", config.name, path.display()));
        }
        None => print!("{}", config.to_yaml()?),
    }

    Ok(())
}
