// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Pipeline validation
//!
//! Validates a pipeline configuration before execution. These are the checks
//! that deserialization cannot express on its own.

use serde_json::Value;
use std::collections::HashSet;

use super::PipelineConfig;
use crate::downloaders::{self, validate_common};
use crate::filter::{BetweenOperator, FilterOperator, FilterRule, RegexOperator};
use crate::readers::{self, ReaderType};
use crate::resolvers::ResolverKind;
use crate::transform::is_valid_date_format;

/// Pipeline validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a pipeline configuration
    pub fn validate(config: &PipelineConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.name.trim().is_empty() {
            result.add_warning("Pipeline has no name");
        }

        Self::validate_download(config, &mut result);
        Self::validate_read(config, &mut result);

        if let Some(filter) = &config.filter {
            for (index, rule) in filter.rules.iter().enumerate() {
                Self::validate_rule(index, rule, &mut result);
            }
        }

        Self::validate_map(config, &mut result);
        Self::validate_images(config, &mut result);
        Self::validate_prepare(config, &mut result);

        if config.options.timeout_secs == Some(0) {
            result.add_error("options.timeout_secs must be greater than 0");
        }

        result
    }

    fn validate_download(config: &PipelineConfig, result: &mut ValidationResult) {
        let download = &config.download;
        if download.source.trim().is_empty() {
            result.add_error("download.source is empty");
        }

        let kind = download.kind.as_ref();
        let accepted = downloaders::accepted_options(download.kind);
        for option in download.options.present() {
            if !accepted.contains(&option) {
                result.add_error(&format!(
                    "download.options.{option} is not accepted by the '{kind}' downloader"
                ));
            }
        }
        if let Err(e) = validate_common(kind, &download.options) {
            result.add_error(&format!("download: {e}"));
        }
    }

    fn validate_read(config: &PipelineConfig, result: &mut ValidationResult) {
        let read = &config.read;
        let kind = read.kind.as_ref();
        let accepted = readers::accepted_options(read.kind);
        for option in read.options.present() {
            if !accepted.contains(&option) {
                result.add_error(&format!(
                    "read.options.{option} is not accepted by the '{kind}' reader"
                ));
            }
        }

        if read.kind == ReaderType::Csv {
            let chars = [
                ("delimiter", &read.options.delimiter),
                ("enclosure", &read.options.enclosure),
                ("escape", &read.options.escape),
            ];
            for (name, value) in chars {
                if let Some(value) = value {
                    if value.chars().count() != 1 || !value.is_ascii() {
                        result.add_error(&format!(
                            "read.options.{name} must be a single ASCII character, got '{value}'"
                        ));
                    }
                }
            }
        }
    }

    fn validate_rule(index: usize, rule: &FilterRule, result: &mut ValidationResult) {
        let at = format!("filter.rules[{index}] ({} {})", rule.key, rule.operator);

        if rule.key.trim().is_empty() {
            result.add_error(&format!("filter.rules[{index}] has an empty key"));
        }

        match rule.operator {
            FilterOperator::Between | FilterOperator::NotBetween => {
                if let Err(reason) = BetweenOperator::bounds(&rule.value) {
                    result.add_error(&format!("{at}: {reason}"));
                }
            }
            FilterOperator::In | FilterOperator::NotIn => {
                if !matches!(rule.value, Value::Array(_) | Value::String(_)) {
                    result.add_error(&format!("{at}: value must be a list"));
                }
            }
            FilterOperator::Regex | FilterOperator::NotRegex => match rule.value.as_str() {
                Some(pattern) => {
                    if RegexOperator::compile(pattern, rule.regex_flags.as_deref()).is_none() {
                        result.add_warning(&format!(
                            "{at}: pattern does not compile; the rule will match nothing"
                        ));
                    }
                }
                None => result.add_error(&format!("{at}: value must be a pattern string")),
            },
            op if op.is_unary() => {
                if !rule.value.is_null() {
                    result.add_warning(&format!("{at}: value is ignored by this operator"));
                }
            }
            _ => {
                if rule.value.is_null() {
                    result.add_warning(&format!("{at}: no value given, comparing against null"));
                }
            }
        }
    }

    fn validate_map(config: &PipelineConfig, result: &mut ValidationResult) {
        let Some(map) = &config.map else {
            return;
        };
        if map.rules.is_empty() && map.static_fields.is_empty() {
            result.add_warning("map section has no rules; every record maps to an empty record");
        }

        let mut targets = HashSet::new();
        for (index, rule) in map.rules.iter().enumerate() {
            if rule.source_field.trim().is_empty() {
                result.add_error(&format!("map.rules[{index}] has an empty source_field"));
            }
            if rule.target_field.trim().is_empty() {
                result.add_error(&format!("map.rules[{index}] has an empty target_field"));
            }
            if rule.is_required && rule.default_value.is_some() {
                result.add_warning(&format!(
                    "map.rules[{index}] ({}) is required; its default_value only applies to empty values",
                    rule.target_field
                ));
            }
            if let Some(format) = &rule.options.date_format {
                if !is_valid_date_format(format) {
                    result.add_error(&format!(
                        "map.rules[{index}] ({}) has an invalid date_format '{format}'",
                        rule.target_field
                    ));
                }
            }
            if !targets.insert(rule.target_field.as_str()) {
                result.add_warning(&format!(
                    "Duplicate target field '{}'; the last rule wins",
                    rule.target_field
                ));
            }
        }
    }

    fn validate_images(config: &PipelineConfig, result: &mut ValidationResult) {
        let Some(images) = &config.images_prepare else {
            return;
        };
        if images.separator.is_empty() {
            result.add_error("images_prepare.separator is empty");
        }
        if images.field.trim().is_empty() {
            result.add_error("images_prepare.field is empty");
        }
    }

    fn validate_prepare(config: &PipelineConfig, result: &mut ValidationResult) {
        let Some(prepare) = &config.prepare else {
            return;
        };

        let mut seen = HashSet::new();
        for kind in &prepare.transformations {
            if !seen.insert(*kind) {
                result.add_warning(&format!("Resolver '{kind}' is listed more than once"));
            }
        }

        if prepare.transformations.contains(&ResolverKind::Category) {
            match &prepare.category {
                None => result.add_error("Resolver 'category' needs a prepare.category section"),
                Some(category) if category.categories.is_empty() && category.default_category_id.is_none() => {
                    result.add_warning("prepare.category has no categories and no default_category_id")
                }
                Some(_) => {}
            }
        }
        if prepare.transformations.contains(&ResolverKind::Pricing) && prepare.pricing.fields.is_empty() {
            result.add_warning("Resolver 'pricing' has no source fields");
        }
        if prepare.transformations.contains(&ResolverKind::StockIdFromVin) && prepare.vin.stock_id_length == 0 {
            result.add_error("prepare.vin.stock_id_length must be greater than 0");
        }
    }
}

/// Validation result
#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
