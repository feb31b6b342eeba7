// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Read stage

use async_trait::async_trait;
use std::sync::Arc;

use super::{warn_rows, Pipe};
use crate::errors::{FeedflowError, FeedflowResult};
use crate::pipeline::{PipelineState, ReadResult, Stage};
use crate::readers::ReaderRegistry;

pub struct ReadPipe {
    readers: Arc<ReaderRegistry>,
}

impl ReadPipe {
    pub fn new(readers: Arc<ReaderRegistry>) -> Self {
        Self { readers }
    }
}

#[async_trait]
impl Pipe for ReadPipe {
    fn stage(&self) -> Stage {
        Stage::Read
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let download = state
            .results
            .download
            .as_ref()
            .ok_or_else(|| PipelineState::missing(Stage::Read, Stage::Download))?;
        let payload = download
            .payload
            .as_deref()
            .ok_or_else(|| FeedflowError::read("The downloaded payload has already been released"))?;

        let reader = self.readers.get(config.read.kind)?;
        tracing::debug!(reader = reader.name(), bytes = payload.len(), "parsing payload");
        let output = reader.read(payload, &config.read.options)?;

        if warn_rows(state) {
            for error in &output.errors {
                tracing::warn!(row = error.index, error = %error.message, "unreadable row skipped");
            }
        }

        state.results.read = Some(ReadResult {
            total: output.records.len() + output.errors.len(),
            records: output.records,
            reader_type: config.read.kind.to_string(),
            errors: output.errors,
        });
        Ok(())
    }

    fn clean_previous_stage(&self, state: &mut PipelineState) {
        if let Some(download) = state.results.download.as_mut() {
            download.release_payload();
        }
    }
}
