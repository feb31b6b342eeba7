// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Pipeline configuration
//!
//! YAML import/export of pipeline definitions and their validation.

mod definition;
mod validation;

pub use definition::{ExecutionOptions, FilterConfig, ImageDownloadMode, ImagesConfig, PipelineConfig};
pub use validation::{ConfigValidator, ValidationResult};
