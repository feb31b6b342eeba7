// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::errors::FeedflowError;

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let config = match PipelineConfig::from_file(&pipeline_path) {
        Ok(config) => config,
        Err(e @ FeedflowError::ConfigNotFound { .. }) => return Err(e.into()),
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline", "✗".red());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    println!("  {} Pipeline file is valid YAML", "✓".green());

    let validation = config.validate();

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
        println!("{}:", "Pipeline summary".bold());
        println!("  Name:     {}", config.name);
        println!("  Download: {} {}", config.download.kind, config.download.source.cyan());
        println!("  Read:     {}", config.read.kind);
        if let Some(filter) = &config.filter {
            println!("  Filter:   {} rules", filter.rules.len());
        }
        if let Some(map) = &config.map {
            println!(
                "  Map:      {} rules, {} static fields",
                map.rules.len(),
                map.static_fields.len()
            );
        }
        if let Some(images) = config.images_prepare.as_ref().filter(|i| i.active) {
            println!("  Images:   field '{}' ({})", images.field, images.download_mode);
        }
        if let Some(prepare) = &config.prepare {
            let resolvers: Vec<String> = prepare.transformations.iter().map(|r| r.to_string()).collect();
            println!("  Prepare:  {}", resolvers.join(", "));
        }
    }

    println!();

    if validation.is_valid() {
        if validation.has_warnings() {
            println!(
                "{} ({} warnings)",
                "Pipeline is valid".green().bold(),
                validation.warnings.len()
            );
        } else {
            println!("{}", "Pipeline is valid".green().bold());
        }
        Ok(())
    } else {
        println!(
            "{} ({} errors)",
            "Pipeline is invalid".red().bold(),
            validation.errors.len()
        );
        Err(miette::miette!("Validation failed"))
    }
}
