// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Category lookup

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{PrepareConfig, ResolveOutcome, Resolver};
use crate::errors::RecordError;
use crate::extract::{extract, insert_path};
use crate::record::{is_empty_value, value_to_f64, value_to_string, Record};

/// A known target category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

fn default_field() -> String {
    "category".to_string()
}

fn default_target_field() -> String {
    "category_id".to_string()
}

/// Category resolver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Field holding the feed's category (id, slug or name)
    #[serde(default = "default_field")]
    pub field: String,

    /// Field receiving the resolved numeric id
    #[serde(default = "default_target_field")]
    pub target_field: String,

    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category_id: Option<i64>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            field: default_field(),
            target_field: default_target_field(),
            categories: Vec::new(),
            default_category_id: None,
        }
    }
}

impl CategoryConfig {
    /// Find a category by numeric id, slug or name
    pub fn lookup(&self, raw: &Value) -> Option<&Category> {
        if let Some(id) = value_to_f64(raw).filter(|n| n.fract() == 0.0) {
            if let Some(found) = self.categories.iter().find(|c| c.id as f64 == id) {
                return Some(found);
            }
        }

        let text = value_to_string(raw);
        let text = text.trim();
        let slug = slugify(text);
        self.categories.iter().find(|c| {
            (!c.slug.is_empty() && c.slug.eq_ignore_ascii_case(&slug))
                || (!c.name.is_empty() && c.name.trim().eq_ignore_ascii_case(text))
        })
    }
}

/// Lowercase, alphanumerics kept, runs of anything else collapsed to `-`
pub(crate) fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Resolves the category id of a record
pub struct CategoryResolver;

impl Resolver for CategoryResolver {
    fn resolve(
        &self,
        record: &mut Record,
        config: &PrepareConfig,
    ) -> Result<ResolveOutcome, RecordError> {
        let Some(settings) = config.category.as_ref() else {
            return Err(RecordError::Resolver {
                resolver: "category".into(),
                reason: "no category configuration".into(),
            });
        };

        let existing = extract(record, &settings.target_field);
        if existing
            .as_ref()
            .and_then(value_to_f64)
            .is_some_and(|id| id > 0.0)
        {
            return Ok(ResolveOutcome::Skipped);
        }

        let resolved = extract(record, &settings.field)
            .filter(|raw| !is_empty_value(raw))
            .and_then(|raw| settings.lookup(&raw).map(|c| c.id))
            .or(settings.default_category_id);

        match resolved {
            Some(id) => {
                insert_path(record, &settings.target_field, Value::from(id));
                Ok(ResolveOutcome::Applied)
            }
            None => Err(RecordError::Resolver {
                resolver: "category".into(),
                reason: format!(
                    "no category matches '{}' and no default is configured",
                    extract(record, &settings.field)
                        .map(|v| value_to_string(&v))
                        .unwrap_or_default()
                ),
            }),
        }
    }
}
