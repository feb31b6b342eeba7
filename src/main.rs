// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! feedflow - Staged feed import engine
//!
//! Download a product feed, read, filter, map and enrich its records, then save them.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedflow::cli::run::RunArgs;
use feedflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `run --format json` keeps stdout clean
    let default_filter = if cli.verbose { "feedflow=debug" } else { "feedflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            config,
            to_stage,
            output,
            no_cache,
            format,
            preview,
        } => {
            let args = RunArgs {
                config,
                to_stage,
                output,
                no_cache,
                format,
                preview,
            };
            feedflow::cli::run::run(args, cli.verbose).await
        }
        Commands::Validate { config } => feedflow::cli::validate::run(config, cli.verbose).await,
        Commands::Export { config, output } => {
            feedflow::cli::export::run(config, output, cli.verbose).await
        }
        Commands::Cache { action } => feedflow::cli::cache::run(action, cli.verbose).await,
    }
}
