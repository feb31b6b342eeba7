// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Pipeline definition structures
//!
//! A [`PipelineConfig`] is the complete, exportable description of one
//! import: where the feed comes from, how to read it, and the configuration
//! of every optional stage. It round-trips through YAML without loss.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::validation::{ConfigValidator, ValidationResult};
use crate::downloaders::DownloadConfig;
use crate::errors::{FeedflowError, FeedflowResult};
use crate::filter::FilterRule;
use crate::mapping::MappingConfig;
use crate::readers::ReadConfig;
use crate::resolvers::PrepareConfig;

fn default_true() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Pipeline configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Identifier of the import target handed to the saver
    #[serde(default)]
    pub target_id: i64,

    /// Where to fetch the feed
    pub download: DownloadConfig,

    /// How to parse the payload
    pub read: ReadConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MappingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_prepare: Option<ImagesConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare: Option<PrepareConfig>,

    /// Execution options
    #[serde(default, skip_serializing_if = "ExecutionOptions::is_default")]
    pub options: ExecutionOptions,
}

impl PipelineConfig {
    /// Minimal pipeline: download and read only
    pub fn new(name: impl Into<String>, download: DownloadConfig, read: ReadConfig) -> Self {
        Self {
            name: name.into(),
            description: None,
            target_id: 0,
            download,
            read,
            filter: None,
            map: None,
            images_prepare: None,
            prepare: None,
            options: ExecutionOptions::default(),
        }
    }

    /// Load a pipeline from a YAML file
    pub fn from_file(path: &Path) -> FeedflowResult<Self> {
        if !path.exists() {
            return Err(FeedflowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| FeedflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a pipeline from a YAML string
    pub fn from_yaml(yaml: &str) -> FeedflowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize the pipeline to YAML
    pub fn to_yaml(&self) -> FeedflowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Write the pipeline as YAML
    pub fn to_file(&self, path: &Path) -> FeedflowResult<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|e| FeedflowError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Run the construction-time checks
    pub fn validate(&self) -> ValidationResult {
        ConfigValidator::validate(self)
    }

    /// Return the pipeline if it has no validation errors
    pub fn validated(self) -> FeedflowResult<Self> {
        let result = self.validate();
        for warning in &result.warnings {
            tracing::warn!(pipeline = %self.name, "{warning}");
        }
        if result.is_valid() {
            Ok(self)
        } else {
            Err(FeedflowError::InvalidConfig {
                reason: result.errors.join("; "),
                help: Some("Run 'feedflow validate <file>' for the full report".into()),
            })
        }
    }
}

/// Filter section: every rule must accept a record for it to survive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

impl FilterConfig {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }
}

/// Which saved products get their images fetched
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageDownloadMode {
    #[default]
    All,
    NewProductsOnly,
    ProductsWithoutImages,
}

/// Images-prepare section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Disabled sections are kept in the document but skipped at run time
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub active: bool,

    /// Record field holding the image references
    #[serde(default = "ImagesConfig::default_field")]
    pub field: String,

    /// Separator for string-encoded image lists
    #[serde(default = "ImagesConfig::default_separator")]
    pub separator: String,

    /// Zero-based positions to drop from every list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_indexes: Vec<usize>,

    #[serde(default)]
    pub download_mode: ImageDownloadMode,
}

impl ImagesConfig {
    fn default_field() -> String {
        "images".into()
    }

    fn default_separator() -> String {
        ",".into()
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            active: true,
            field: Self::default_field(),
            separator: Self::default_separator(),
            skip_indexes: Vec::new(),
            download_mode: ImageDownloadMode::All,
        }
    }
}

/// Execution options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Serve the download from the local cache when possible
    #[serde(default, skip_serializing_if = "is_false")]
    pub cache: bool,

    /// Maximum cache entry age; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,

    /// Emit per-row warnings
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub logging: bool,

    /// Upper bound for the Download stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Escalate record errors to a stage failure
    #[serde(default, skip_serializing_if = "is_false")]
    pub stop_on_error: bool,

    /// Release the previous stage's records once the next stage has run
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub release_intermediate: bool,
}

impl ExecutionOptions {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            cache: false,
            cache_ttl_secs: None,
            logging: true,
            timeout_secs: None,
            stop_on_error: false,
            release_intermediate: true,
        }
    }
}
