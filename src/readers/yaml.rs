// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! YAML reader

use serde_json::Value;

use super::{records_from_document, strip_bom, ReadOutput, Reader, ReaderOptions};
use crate::errors::{FeedflowError, FeedflowResult};

pub(crate) const ACCEPTED: &[&str] = &["entry_point"];

pub struct YamlReader;

impl Reader for YamlReader {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        ACCEPTED
    }

    fn read(&self, payload: &[u8], options: &ReaderOptions) -> FeedflowResult<ReadOutput> {
        self.validate_options(options)?;
        let document: Value = serde_yaml::from_slice(strip_bom(payload))
            .map_err(|e| FeedflowError::read(format!("Invalid YAML: {e}")))?;
        records_from_document(&document, options.entry_point.as_deref())
    }
}
