// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::OutputFormat;
use crate::cache::FilesystemCache;
use crate::config::PipelineConfig;
use crate::downloaders::DownloaderType;
use crate::errors::FeedflowError;
use crate::pipeline::{PipelineOrchestrator, RunResult, Stage};
use crate::saver::JsonFileSaver;
use crate::utils::{create_spinner, format_delta, format_duration, print_error, print_header, print_section, print_warning};

/// Arguments of the run command
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub config: PathBuf,
    pub to_stage: Option<Stage>,
    pub output: Option<PathBuf>,
    pub no_cache: bool,
    pub format: OutputFormat,
    pub preview: usize,
}

/// Run the pipeline
pub async fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let mut config = PipelineConfig::from_file(&args.config)?;

    let validation = config.validate();
    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    resolve_local_source(&mut config, &args.config);

    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    let mut orchestrator = PipelineOrchestrator::new();

    if args.no_cache {
        config.options.cache = false;
    } else if config.options.cache {
        let cache = FilesystemCache::default_cache(&working_dir)?
            .with_ttl(config.options.cache_ttl_secs.map(Duration::from_secs));
        orchestrator = orchestrator.with_cache(Arc::new(cache));
    }

    let mut target = args.to_stage;
    match &args.output {
        Some(path) => {
            orchestrator = orchestrator.with_saver(Arc::new(JsonFileSaver::new(path)));
        }
        None if target.map_or(true, |t| t.reached(Stage::Save)) => {
            eprintln!(
                "  {} No --output given; stopping after {}",
                "⚠".yellow(),
                Stage::Prepare
            );
            target = Some(Stage::Prepare);
        }
        None => {}
    }

    let spinner = (args.format == OutputFormat::Text)
        .then(|| create_spinner(&format!("Running pipeline '{}'", config.name)));

    let result = match target {
        Some(stage) => orchestrator.run_to_stage(&config, stage).await,
        None => orchestrator.run(&config).await,
    };

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(FeedflowError::from)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            print_summary(&result, args.output.as_deref());
            if args.preview > 0 {
                print_preview(&result, args.preview)?;
            }
        }
    }

    if let Some(stage) = result.halted_stage {
        return Err(miette::miette!("Pipeline execution failed at the {} stage", stage));
    }

    Ok(())
}

/// Relative `file` sources are resolved against the pipeline file's directory
fn resolve_local_source(config: &mut PipelineConfig, pipeline_path: &Path) {
    if config.download.kind != DownloaderType::File || config.download.source.contains("://") {
        return;
    }
    let source = Path::new(&config.download.source);
    if source.is_absolute() {
        return;
    }
    if let Some(dir) = pipeline_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        config.download.source = dir.join(source).to_string_lossy().into_owned();
    }
}

fn print_summary(result: &RunResult, output: Option<&Path>) {
    print_header(&format!("Pipeline '{}'", result.pipeline));

    for metrics in &result.stages {
        let failed = result.halted_stage == Some(metrics.stage);
        let symbol = if failed {
            "✗".red()
        } else if metrics.record_errors > 0 {
            "⚠".yellow()
        } else {
            "✓".green()
        };
        let record_errors = if metrics.record_errors > 0 {
            format!("  {} record errors", metrics.record_errors).yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {:<14} {:>7} rows  {:>8}  {:>12}{}",
            symbol,
            metrics.stage.to_string(),
            metrics.rows,
            format_duration(Duration::from_millis(metrics.duration_ms)),
            format_delta(metrics.memory_delta_bytes).dimmed(),
            record_errors
        );
    }

    if let Some(save) = &result.results.save {
        print_section("Saved");
        println!(
            "  {} created, {} updated, {} images dispatched",
            save.created, save.updated, save.images_dispatched
        );
        if let Some(path) = output {
            println!("  {}", path.display());
        }
    }

    if result.has_errors() {
        print_section("Errors");
        for error in &result.errors {
            if result.halted_stage.is_some() && result.errors.last() == Some(error) {
                print_error(error);
            } else {
                print_warning(error);
            }
        }
    }

    println!();
    let duration = format_duration(Duration::from_millis(result.duration_ms));
    if result.is_failed() {
        println!("{} after {}", "Pipeline failed".red().bold(), duration);
    } else if result.target_stage.is_some_and(|t| !t.reached(Stage::Save)) {
        println!(
            "{} after {} in {}",
            "Stopped".green().bold(),
            result.last_stage.map(|s| s.to_string()).unwrap_or_default(),
            duration
        );
    } else {
        println!("{} in {}", "Pipeline completed".green().bold(), duration);
    }
    println!(
        "  Peak memory {}, delta {}",
        crate::cache::format_bytes(result.peak_memory_bytes),
        format_delta(result.memory_delta_bytes)
    );
}

fn print_preview(result: &RunResult, limit: usize) -> Result<()> {
    let Some((stage, records)) = result.last_records() else {
        println!();
        println!("{}", "No records to preview.".dimmed());
        return Ok(());
    };

    print_section(&format!("{} records (first {} of {})", stage, limit.min(records.len()), records.len()));
    for record in records.iter().take(limit) {
        let json = serde_json::to_string_pretty(record).map_err(FeedflowError::from)?;
        println!("{}", json);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloaders::DownloadConfig;
    use crate::readers::{ReadConfig, ReaderType};

    fn config(kind: DownloaderType, source: &str) -> PipelineConfig {
        PipelineConfig::new("t", DownloadConfig::new(kind, source), ReadConfig::new(ReaderType::Csv))
    }

    #[test]
    fn test_resolve_local_source() {
        let mut relative = config(DownloaderType::File, "feed.csv");
        resolve_local_source(&mut relative, Path::new("pipelines/shop.yaml"));
        assert_eq!(
            PathBuf::from(&relative.download.source),
            Path::new("pipelines").join("feed.csv")
        );

        let mut bare = config(DownloaderType::File, "feed.csv");
        resolve_local_source(&mut bare, Path::new("shop.yaml"));
        assert_eq!(bare.download.source, "feed.csv");

        let mut url = config(DownloaderType::File, "file:///tmp/feed.csv");
        resolve_local_source(&mut url, Path::new("pipelines/shop.yaml"));
        assert_eq!(url.download.source, "file:///tmp/feed.csv");

        let mut http = config(DownloaderType::Http, "feed.csv");
        resolve_local_source(&mut http, Path::new("pipelines/shop.yaml"));
        assert_eq!(http.download.source, "feed.csv");
    }
}
