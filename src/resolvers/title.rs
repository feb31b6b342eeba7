// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Title synthesis from year, make and model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{has_value, PrepareConfig, ResolveOutcome, Resolver};
use crate::errors::RecordError;
use crate::extract::{extract, insert_path};
use crate::record::{is_empty_value, value_to_string, Record};

fn default_title() -> String {
    "title".to_string()
}

fn default_year() -> String {
    "year".to_string()
}

fn default_make() -> String {
    "make".to_string()
}

fn default_model() -> String {
    "model".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleConfig {
    #[serde(default = "default_title")]
    pub field: String,
    #[serde(default = "default_year")]
    pub year_field: String,
    #[serde(default = "default_make")]
    pub make_field: String,
    #[serde(default = "default_model")]
    pub model_field: String,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            field: default_title(),
            year_field: default_year(),
            make_field: default_make(),
            model_field: default_model(),
        }
    }
}

impl TitleConfig {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

pub struct TitleResolver;

impl Resolver for TitleResolver {
    fn resolve(
        &self,
        record: &mut Record,
        config: &PrepareConfig,
    ) -> Result<ResolveOutcome, RecordError> {
        let settings = &config.title;
        if has_value(record, &settings.field) {
            return Ok(ResolveOutcome::Skipped);
        }

        let parts: Option<Vec<String>> = [
            &settings.year_field,
            &settings.make_field,
            &settings.model_field,
        ]
        .iter()
        .map(|field| {
            extract(record, field)
                .filter(|v| !is_empty_value(v))
                .map(|v| value_to_string(&v).trim().to_string())
        })
        .collect();

        match parts {
            Some(parts) => {
                insert_path(record, &settings.field, Value::String(parts.join(" ")));
                Ok(ResolveOutcome::Applied)
            }
            None => Ok(ResolveOutcome::Skipped),
        }
    }
}
