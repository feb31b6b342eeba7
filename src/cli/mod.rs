// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for feedflow.

pub mod cache;
pub mod export;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::Stage;

/// Staged feed import engine
///
/// Download a feed, read, filter, map and enrich its records, then save them.
#[derive(Parser, Debug)]
#[clap(
    name = "feedflow",
    version,
    about = "Staged feed import engine: download, read, filter, map, prepare and save",
    long_about = None,
    after_help = "Examples:\n\
        feedflow run -c pipeline.yaml -o out.json      Run the whole pipeline\n\
        feedflow run -c pipeline.yaml --to-stage filter --preview 5\n\
        \x20                                             Test the pipeline up to the filter step\n\
        feedflow validate pipeline.yaml                Check a pipeline definition\n\
        feedflow export pipeline.yaml -o normalized.yaml\n\n\
        See 'feedflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline, fully or up to one stage
    Run {
        /// Pipeline file
        #[clap(short, long, default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Stop after this stage (download, read, filter, map, images_prepare, prepare, save)
        #[clap(long, value_name = "STAGE")]
        to_stage: Option<Stage>,

        /// Write the saved records to this JSON file
        #[clap(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip the download cache
        #[clap(long)]
        no_cache: bool,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,

        /// Print the first N records of the last stage
        #[clap(long, value_name = "N", default_value = "0")]
        preview: usize,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = "pipeline.yaml")]
        config: PathBuf,
    },

    /// Re-emit a pipeline definition as normalized YAML
    Export {
        /// Pipeline file
        config: PathBuf,

        /// Output file (default: stdout)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Download cache management
    Cache {
        #[clap(subcommand)]
        action: CacheAction,
    },
}

/// Cache management actions
#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Clear the cache
    Clear {
        /// Skip confirmation
        #[clap(short, long)]
        yes: bool,
    },
}

/// Output format for the run command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
