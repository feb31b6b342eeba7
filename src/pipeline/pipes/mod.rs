// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Stage pipes
//!
//! Each pipe implements one stage. [`handle`] wraps every pipe with the
//! shared behaviour: timing, memory snapshots, cleanup of the previous
//! stage, and conversion of a failure into a halting pipeline error.

mod download;
mod filter;
mod images;
mod map;
mod prepare;
mod read;
mod save;

pub use download::DownloadPipe;
pub use filter::FilterPipe;
pub use images::ImagesPreparePipe;
pub use map::MapPipe;
pub use prepare::PreparePipe;
pub use read::ReadPipe;
pub use save::SavePipe;

use async_trait::async_trait;
use std::time::{Duration, Instant};

use super::{MemorySampler, PipelineState, Stage};
use crate::errors::{FeedflowError, FeedflowResult};

/// One stage of the chain
#[async_trait]
pub trait Pipe: Send + Sync {
    fn stage(&self) -> Stage;

    /// Optional stages return false when they are not configured
    fn is_enabled(&self, _state: &PipelineState) -> bool {
        true
    }

    /// Run the stage and attach its result to `state`
    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()>;

    /// Release bulky data of the preceding stage once this one succeeded
    fn clean_previous_stage(&self, _state: &mut PipelineState) {}
}

/// Whether per-row warnings should be logged for this run
pub(crate) fn warn_rows(state: &PipelineState) -> bool {
    state.config.options.logging
}

/// Run one pipe; returns false when the stage failed and the run must stop
pub(crate) async fn handle(pipe: &dyn Pipe, state: &mut PipelineState, sampler: &MemorySampler) -> bool {
    let stage = pipe.stage();
    state.current_stage = Some(stage);

    if !pipe.is_enabled(state) {
        tracing::debug!(stage = %stage, "stage not configured, passing through");
        return true;
    }

    tracing::info!(stage = %stage, "stage started");
    let started = Instant::now();
    let memory_before = sampler.sample();

    let timeout = state.config.options.timeout_secs.filter(|_| stage == Stage::Download);
    let outcome = match timeout {
        Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), pipe.process(state))
            .await
            .unwrap_or(Err(FeedflowError::Timeout { seconds })),
        None => pipe.process(state).await,
    };
    let outcome = outcome.and_then(|()| escalate_record_errors(stage, state));

    let elapsed = started.elapsed();
    let memory_after = sampler.sample();
    let delta = memory_after as i64 - memory_before as i64;
    state.stage_timings.insert(stage, elapsed);
    state.memory_deltas.insert(stage, delta);
    state.peak_memory = state.peak_memory.max(memory_after);

    match outcome {
        Ok(()) => {
            let record_errors = state.results.record_errors(stage).len();
            tracing::info!(
                stage = %stage,
                rows = state.results.rows(stage),
                record_errors,
                duration_ms = elapsed.as_millis() as u64,
                memory_delta = delta,
                "stage finished"
            );
            pipe.clean_previous_stage(state);
            true
        }
        Err(e) => {
            tracing::error!(stage = %stage, error = %e, duration_ms = elapsed.as_millis() as u64, "stage failed");
            state.errors.push(format!("{stage} failed: {e}"));
            state.halted = Some(stage);
            false
        }
    }
}

fn escalate_record_errors(stage: Stage, state: &PipelineState) -> FeedflowResult<()> {
    if !state.config.options.stop_on_error {
        return Ok(());
    }
    match state.results.record_errors(stage) {
        [] => Ok(()),
        errors => Err(FeedflowError::RecordErrors {
            count: errors.len(),
            first: errors[0].to_string(),
        }),
    }
}
