// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Filter stage

use async_trait::async_trait;
use std::sync::Arc;

use super::{warn_rows, Pipe};
use crate::errors::FeedflowResult;
use crate::filter::{FilterEngine, OperatorRegistry};
use crate::pipeline::{PipelineState, Stage};

pub struct FilterPipe {
    operators: Arc<OperatorRegistry>,
}

impl FilterPipe {
    pub fn new(operators: Arc<OperatorRegistry>) -> Self {
        Self { operators }
    }
}

#[async_trait]
impl Pipe for FilterPipe {
    fn stage(&self) -> Stage {
        Stage::Filter
    }

    fn is_enabled(&self, state: &PipelineState) -> bool {
        state.config.filter.is_some()
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let rules = config.filter.as_ref().map(|f| f.rules.as_slice()).unwrap_or(&[]);
        let read = state
            .results
            .read
            .as_ref()
            .ok_or_else(|| PipelineState::missing(Stage::Filter, Stage::Read))?;

        let engine = FilterEngine::new(rules, &self.operators)?;
        let result = engine.apply(&read.records, warn_rows(state));
        tracing::debug!(
            total = result.total,
            kept = result.filtered_count,
            excluded = result.excluded_count,
            "filter applied"
        );

        state.results.filter = Some(result);
        Ok(())
    }

    fn clean_previous_stage(&self, state: &mut PipelineState) {
        if !state.config.options.release_intermediate {
            return;
        }
        if let Some(read) = state.results.read.as_mut() {
            read.records = Vec::new();
        }
    }
}
