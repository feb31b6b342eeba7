// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Map stage
//!
//! Without a mapping section the input records pass through unchanged, so
//! later stages always find a mapping result.

use async_trait::async_trait;
use std::sync::Arc;

use super::{warn_rows, Pipe};
use crate::errors::FeedflowResult;
use crate::mapping::DataMapper;
use crate::pipeline::{MappingResult, PipelineState, Stage};
use crate::transform::TransformerRegistry;

pub struct MapPipe {
    transformers: Arc<TransformerRegistry>,
}

impl MapPipe {
    pub fn new(transformers: Arc<TransformerRegistry>) -> Self {
        Self { transformers }
    }
}

#[async_trait]
impl Pipe for MapPipe {
    fn stage(&self) -> Stage {
        Stage::Map
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let input = state.map_input()?;

        let result = match &config.map {
            Some(mapping) => {
                let mapper = DataMapper::new(mapping, &self.transformers)?;
                mapper.apply(input, warn_rows(state))
            }
            None => MappingResult {
                records: input.to_vec(),
                total: input.len(),
                mapped_count: input.len(),
                errors: Vec::new(),
            },
        };
        tracing::debug!(total = result.total, mapped = result.mapped_count, "mapping applied");

        state.results.mapping = Some(result);
        Ok(())
    }

    fn clean_previous_stage(&self, state: &mut PipelineState) {
        if !state.config.options.release_intermediate {
            return;
        }
        match (state.results.filter.as_mut(), state.results.read.as_mut()) {
            (Some(filter), _) => filter.records = Vec::new(),
            (None, Some(read)) => read.records = Vec::new(),
            (None, None) => {}
        }
    }
}
