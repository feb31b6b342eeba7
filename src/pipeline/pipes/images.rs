// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! ImagesPrepare stage: normalizes the image field of mapped records into a list

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::Pipe;
use crate::config::ImagesConfig;
use crate::errors::FeedflowResult;
use crate::extract::{extract, insert_path};
use crate::pipeline::{ImagesResult, PipelineState, Stage};
use crate::record::{value_to_string, Record};

pub struct ImagesPreparePipe;

/// Split a raw image value into its entries, in order
pub(super) fn split_images(value: &Value, separator: &str) -> Vec<String> {
    let split = |s: &str| -> Vec<String> {
        s.split(separator)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    };
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(value_to_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => split(s),
        other => split(&value_to_string(other)),
    }
}

/// Rewrite one record; returns `(kept, dropped)` or `None` when it has no image field
fn prepare_record(record: &mut Record, config: &ImagesConfig) -> Option<(usize, usize)> {
    let raw = extract(record, &config.field)?;
    let images = split_images(&raw, &config.separator);
    let before = images.len();
    let kept: Vec<Value> = images
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !config.skip_indexes.contains(index))
        .map(|(_, url)| Value::String(url))
        .collect();
    let counts = (kept.len(), before - kept.len());
    insert_path(record, &config.field, Value::Array(kept));
    Some(counts)
}

#[async_trait]
impl Pipe for ImagesPreparePipe {
    fn stage(&self) -> Stage {
        Stage::ImagesPrepare
    }

    fn is_enabled(&self, state: &PipelineState) -> bool {
        state.config.images_prepare.as_ref().is_some_and(|images| images.active)
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let Some(images) = config.images_prepare.as_ref() else {
            return Ok(());
        };
        let mapping = state
            .results
            .mapping
            .as_mut()
            .ok_or_else(|| PipelineState::missing(Stage::ImagesPrepare, Stage::Map))?;

        let mut result = ImagesResult::default();
        for record in mapping.records.iter_mut() {
            if let Some((kept, dropped)) = prepare_record(record, images) {
                result.processed += 1;
                result.images_kept += kept;
                result.images_dropped += dropped;
            }
        }

        state.results.images = Some(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(separator: &str, skip: Vec<usize>) -> ImagesConfig {
        ImagesConfig {
            separator: separator.into(),
            skip_indexes: skip,
            ..Default::default()
        }
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_string_split_and_skip() {
        let mut r = record(json!({"images": "a.jpg | b.jpg || c.jpg"}));
        let counts = prepare_record(&mut r, &config("|", vec![0])).unwrap();
        assert_eq!(counts, (2, 1));
        assert_eq!(r["images"], json!(["b.jpg", "c.jpg"]));
    }

    #[test]
    fn test_array_input() {
        let mut r = record(json!({"images": ["a", null, "b", "c"]}));
        prepare_record(&mut r, &config(",", vec![2])).unwrap();
        assert_eq!(r["images"], json!(["a", "b"]));
    }

    #[test]
    fn test_missing_field_untouched() {
        let mut r = record(json!({"title": "x"}));
        assert!(prepare_record(&mut r, &config(",", vec![])).is_none());
        assert!(!r.contains_key("images"));
    }

    #[test]
    fn test_out_of_range_skip_index_is_ignored() {
        let mut r = record(json!({"images": "a,b"}));
        assert_eq!(prepare_record(&mut r, &config(",", vec![5])), Some((2, 0)));
    }
}
