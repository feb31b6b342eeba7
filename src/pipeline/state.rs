// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Run state threaded through the stages, and the final run report

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Stage, StageResults};
use crate::config::PipelineConfig;
use crate::errors::{FeedflowError, FeedflowResult};
use crate::record::Record;

/// Mutable state of one run
///
/// Created by the orchestrator, handed to each pipe by `&mut` in stage
/// order, and finally converted into a [`RunResult`]. Result slots are only
/// ever filled in stage order.
#[derive(Debug)]
pub struct PipelineState {
    pub config: Arc<PipelineConfig>,
    pub results: StageResults,
    /// Stage most recently entered
    pub current_stage: Option<Stage>,
    /// Stop after this stage; `None` runs to completion
    pub target_stage: Option<Stage>,
    pub stage_timings: IndexMap<Stage, Duration>,
    /// Resident memory change per stage, in bytes
    pub memory_deltas: IndexMap<Stage, i64>,
    /// Pipeline-level errors (`"<Stage> failed: ..."`)
    pub errors: Vec<String>,
    pub started_at: Instant,
    pub started_at_utc: DateTime<Utc>,
    pub start_memory: u64,
    pub peak_memory: u64,
    /// Stage that failed and stopped the run
    pub halted: Option<Stage>,
}

impl PipelineState {
    pub fn new(config: Arc<PipelineConfig>, target_stage: Option<Stage>) -> Self {
        Self {
            config,
            results: StageResults::default(),
            current_stage: None,
            target_stage,
            stage_timings: IndexMap::new(),
            memory_deltas: IndexMap::new(),
            errors: Vec::new(),
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            start_memory: 0,
            peak_memory: 0,
            halted: None,
        }
    }

    /// Set the memory baseline the run is measured against
    pub fn with_baseline(mut self, memory: u64) -> Self {
        self.start_memory = memory;
        self.peak_memory = memory;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The current stage is at or past the target stage
    pub fn reached_target(&self) -> bool {
        match (self.current_stage, self.target_stage) {
            (Some(current), Some(target)) => current.reached(target),
            _ => false,
        }
    }

    /// Error for a stage whose upstream result is missing
    pub fn missing(stage: Stage, requires: Stage) -> FeedflowError {
        FeedflowError::MissingUpstream {
            stage: stage.to_string(),
            requires: requires.to_string(),
        }
    }

    /// Records the Map stage starts from: filtered if a filter ran, read otherwise
    pub fn map_input(&self) -> FeedflowResult<&[Record]> {
        if let Some(filter) = &self.results.filter {
            return Ok(&filter.records);
        }
        self.results
            .read
            .as_ref()
            .map(|r| r.records.as_slice())
            .ok_or_else(|| Self::missing(Stage::Map, Stage::Read))
    }

    /// Freeze the state into a report; `end_memory` is the final memory reading
    pub fn into_result(self, end_memory: u64) -> RunResult {
        let mut errors = Vec::new();
        let mut stages = Vec::new();

        for (stage, duration) in &self.stage_timings {
            stages.push(StageMetrics {
                stage: *stage,
                duration_ms: duration.as_millis() as u64,
                memory_delta_bytes: self.memory_deltas.get(stage).copied().unwrap_or(0),
                rows: self.results.rows(*stage),
                record_errors: self.results.record_errors(*stage).len(),
            });
            for row_error in self.results.record_errors(*stage) {
                errors.push(format!("{stage} {row_error}"));
            }
        }
        errors.extend(self.errors);

        RunResult {
            pipeline: self.config.name.clone(),
            success: self.halted.is_none(),
            halted_stage: self.halted,
            last_stage: self.current_stage,
            target_stage: self.target_stage,
            started_at: self.started_at_utc,
            duration_ms: self.started_at.elapsed().as_millis() as u64,
            peak_memory_bytes: self.peak_memory.max(end_memory),
            memory_delta_bytes: end_memory as i64 - self.start_memory as i64,
            stages,
            errors,
            results: self.results,
        }
    }
}

/// Timing, memory and row counts of one executed stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMetrics {
    pub stage: Stage,
    pub duration_ms: u64,
    pub memory_delta_bytes: i64,
    pub rows: usize,
    pub record_errors: usize,
}

/// Immutable report of a finished (or truncated) run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub pipeline: String,
    /// No stage halted the run; record errors do not affect this
    pub success: bool,
    pub halted_stage: Option<Stage>,
    pub last_stage: Option<Stage>,
    pub target_stage: Option<Stage>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub peak_memory_bytes: u64,
    pub memory_delta_bytes: i64,
    pub stages: Vec<StageMetrics>,
    /// Record errors of each stage in stage order, then the halt error
    pub errors: Vec<String>,
    pub results: StageResults,
}

impl RunResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_failed(&self) -> bool {
        !self.success
    }

    /// Records held by the latest stage that produced any
    pub fn last_records(&self) -> Option<(Stage, &[Record])> {
        self.stages
            .iter()
            .rev()
            .find_map(|m| self.results.records(m.stage).map(|records| (m.stage, records)))
    }
}
