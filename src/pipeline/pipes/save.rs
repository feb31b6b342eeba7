// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Save stage
//!
//! Persistence is delegated to the configured [`ResultSaver`]. Image fetches
//! are then dispatched per saved entity according to the images download mode.

use async_trait::async_trait;
use std::sync::Arc;

use super::images::split_images;
use super::{warn_rows, Pipe};
use crate::config::{ImageDownloadMode, ImagesConfig};
use crate::errors::{FeedflowError, FeedflowResult, RowError};
use crate::extract::extract;
use crate::pipeline::{PipelineState, SaveResult, Stage};
use crate::record::Record;
use crate::saver::{ImageFetcher, ResultSaver, SavedEntity};

pub struct SavePipe {
    saver: Option<Arc<dyn ResultSaver>>,
    image_fetcher: Option<Arc<dyn ImageFetcher>>,
}

impl SavePipe {
    pub fn new(saver: Option<Arc<dyn ResultSaver>>, image_fetcher: Option<Arc<dyn ImageFetcher>>) -> Self {
        Self { saver, image_fetcher }
    }
}

fn wants_images(mode: ImageDownloadMode, entity: &SavedEntity) -> bool {
    match mode {
        ImageDownloadMode::All => true,
        ImageDownloadMode::NewProductsOnly => entity.created,
        ImageDownloadMode::ProductsWithoutImages => !entity.has_images,
    }
}

async fn dispatch_images(
    fetcher: &dyn ImageFetcher,
    config: &ImagesConfig,
    records: &[Record],
    result: &mut SaveResult,
    warn: bool,
) {
    for entity in &result.entities {
        if !wants_images(config.download_mode, entity) {
            continue;
        }
        let images = records
            .get(entity.row_index)
            .and_then(|record| extract(record, &config.field))
            .map(|value| split_images(&value, &config.separator))
            .unwrap_or_default();
        if images.is_empty() {
            continue;
        }

        match fetcher.dispatch(entity, &images).await {
            Ok(()) => result.images_dispatched += 1,
            Err(e) => {
                if warn {
                    tracing::warn!(row = entity.row_index, reference = %entity.reference, error = %e, "image dispatch failed");
                }
                result.errors.push(RowError::new(
                    entity.row_index,
                    format!("image dispatch for '{}' failed: {e}", entity.reference),
                ));
            }
        }
    }
}

#[async_trait]
impl Pipe for SavePipe {
    fn stage(&self) -> Stage {
        Stage::Save
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let prepare = state
            .results
            .prepare
            .as_ref()
            .ok_or_else(|| PipelineState::missing(Stage::Save, Stage::Prepare))?;
        let saver = self.saver.as_deref().ok_or_else(|| FeedflowError::SaveFailed {
            message: "no result saver configured".into(),
        })?;

        let mut result = saver.save(state, config.target_id).await?;
        tracing::debug!(created = result.created, updated = result.updated, "records saved");

        let images = config.images_prepare.as_ref().filter(|images| images.active);
        if let (Some(fetcher), Some(images)) = (self.image_fetcher.as_deref(), images) {
            dispatch_images(fetcher, images, &prepare.records, &mut result, warn_rows(state)).await;
        }

        state.results.save = Some(result);
        Ok(())
    }
}
