// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Pipeline execution
//!
//! The stage chain, the state threaded through it, the per-stage results
//! and the orchestrator that runs a pipeline fully or up to a target stage.

mod memory;
mod orchestrator;
pub mod pipes;
mod results;
mod stage;
mod state;

pub use memory::MemorySampler;
pub use orchestrator::PipelineOrchestrator;
pub use results::{
    DownloadResult, FilterResult, ImagesResult, MappingResult, PrepareResult, ReadResult,
    ResolverStats, SaveResult, StageResults,
};
pub use stage::Stage;
pub use state::{PipelineState, RunResult, StageMetrics};
