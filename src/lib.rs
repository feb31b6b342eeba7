// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! # feedflow - Staged feed import engine
//!
//! `feedflow` imports product feeds through a fixed chain of stages:
//! Download, Read, Filter, Map, ImagesPrepare, Prepare and Save.
//!
//! ## Features
//!
//! - **Pluggable strategies** - downloaders (http, https, ftp, sftp, file) and readers (csv, json, xml, yaml)
//! - **Declarative rules** - filter operators, field transformers and record resolvers configured in YAML
//! - **Partial runs** - stop after any stage to inspect intermediate records
//! - **Download cache** - re-run a pipeline without fetching the feed again
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a pipeline definition
//! feedflow validate pipeline.yaml
//!
//! # Test it up to the filter step
//! feedflow run -c pipeline.yaml --to-stage filter --preview 5
//!
//! # Run it and save the prepared records
//! feedflow run -c pipeline.yaml -o products.json
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod downloaders;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod mapping;
pub mod pipeline;
pub mod readers;
pub mod record;
pub mod resolvers;
pub mod saver;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use errors::{FeedflowError, FeedflowResult};
pub use pipeline::{PipelineOrchestrator, RunResult, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
