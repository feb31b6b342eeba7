// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Persistence boundary
//!
//! The engine never writes to the catalog itself. A [`ResultSaver`] receives
//! the finished pipeline state and reports, per saved row, whether it created
//! a new product and whether that product already has images. The Save stage
//! uses those two flags to decide which image fetches to dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{FeedflowError, FeedflowResult, RowError};
use crate::pipeline::PipelineState;
use crate::record::value_to_string;

/// One persisted row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedEntity {
    /// Index into the prepared records
    pub row_index: usize,
    /// Identifier in the target catalog
    pub reference: String,
    /// The row created a new product rather than updating one
    pub created: bool,
    /// The product already had stored images before this save
    pub has_images: bool,
}

/// Outcome of the Save stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<RowError>,
    pub entities: Vec<SavedEntity>,
    /// Image fetches handed to the image fetcher
    #[serde(default)]
    pub images_dispatched: usize,
}

/// Persists prepared records into the target catalog
#[async_trait]
pub trait ResultSaver: Send + Sync {
    /// Save the prepared records of `state` into target `target_id`
    ///
    /// Row failures belong in [`SaveResult::errors`]; an `Err` fails the stage.
    async fn save(&self, state: &PipelineState, target_id: i64) -> FeedflowResult<SaveResult>;
}

/// Fetches the images of a saved product in the background
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn dispatch(&self, entity: &SavedEntity, images: &[String]) -> FeedflowResult<()>;
}

/// Writes prepared records to a JSON file; every row counts as created
pub struct JsonFileSaver {
    path: PathBuf,
    reference_field: Option<String>,
}

impl JsonFileSaver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reference_field: None,
        }
    }

    /// Take entity references from this record field instead of the row index
    pub fn with_reference_field(mut self, field: impl Into<String>) -> Self {
        self.reference_field = Some(field.into());
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ResultSaver for JsonFileSaver {
    async fn save(&self, state: &PipelineState, target_id: i64) -> FeedflowResult<SaveResult> {
        let records = state
            .results
            .prepare
            .as_ref()
            .map(|p| p.records.as_slice())
            .unwrap_or(&[]);

        let json = serde_json::to_string_pretty(records)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| FeedflowError::FileWriteError {
                path: self.path.clone(),
                error: e.to_string(),
            })?;

        let entities: Vec<SavedEntity> = records
            .iter()
            .enumerate()
            .map(|(row_index, record)| {
                let reference = self
                    .reference_field
                    .as_ref()
                    .and_then(|field| record.get(field))
                    .map(value_to_string)
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| row_index.to_string());
                SavedEntity {
                    row_index,
                    reference,
                    created: true,
                    has_images: false,
                }
            })
            .collect();

        tracing::debug!(path = %self.path.display(), target_id, rows = entities.len(), "records written");

        Ok(SaveResult {
            created: entities.len(),
            updated: 0,
            errors: Vec::new(),
            entities,
            images_dispatched: 0,
        })
    }
}
