// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Price normalization
//!
//! Every configured price field is classified as numeric, free text, or
//! absent. Numeric values become `{field, type: "numeric", amount, raw}`
//! entries, free text becomes `{field, type: "text", text}`. Absent fields
//! produce no entry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;

use super::{PrepareConfig, ResolveOutcome, Resolver};
use crate::errors::RecordError;
use crate::extract::{extract, insert_path};
use crate::record::{is_empty_value, number_value, value_to_string, Record};

fn default_fields() -> Vec<String> {
    vec!["price".to_string()]
}

fn default_target_field() -> String {
    "prices".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Source price fields, in output order
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Field receiving the list of price entries
    #[serde(default = "default_target_field")]
    pub target_field: String,

    /// Currency attached to numeric entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            target_field: default_target_field(),
            currency: None,
        }
    }
}

impl PricingConfig {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// Amount with optional currency code or symbol on either side
fn price_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)^\s*(?:[a-z]{3}|[€$£¥])?\s*(-?\d[\d\s.,']*)\s*(?:[a-z]{3}|[€$£¥]|,-|\.-)?\s*$",
            )
            .ok()
        })
        .as_ref()
}

/// Parse a price string
///
/// Both `,` and `.` are accepted as decimal separator. When both appear, the
/// last one is the decimal separator. A single separator followed by exactly
/// three digits is a thousands separator, as is any separator that repeats.
pub fn parse_price(raw: &str) -> Option<f64> {
    let captures = price_pattern()?.captures(raw)?;
    let digits: String = captures[1]
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();
    let digits = digits.trim_end_matches(['.', ',']);

    let last_comma = digits.rfind(',');
    let last_dot = digits.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            let (decimal, thousands) = if c > d { (',', '.') } else { ('.', ',') };
            digits.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => normalize_single(&digits, ','),
        (None, Some(_)) => normalize_single(&digits, '.'),
        (None, None) => digits.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn normalize_single(digits: &str, separator: char) -> String {
    let count = digits.matches(separator).count();
    let tail = digits.rsplit(separator).next().unwrap_or_default();
    if count > 1 || tail.len() == 3 {
        digits.replace(separator, "")
    } else {
        digits.replace(separator, ".")
    }
}

pub struct PricingResolver;

impl PricingResolver {
    fn entry(field: &str, value: &Value, currency: Option<&str>) -> Value {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            other => parse_price(&value_to_string(other)),
        };

        match parsed {
            Some(amount) => {
                let mut entry = json!({
                    "field": field,
                    "type": "numeric",
                    "amount": number_value(amount),
                    "raw": value_to_string(value),
                });
                if let (Some(currency), Value::Object(map)) = (currency, &mut entry) {
                    map.insert("currency".into(), Value::String(currency.to_string()));
                }
                entry
            }
            None => json!({
                "field": field,
                "type": "text",
                "text": value_to_string(value).trim(),
            }),
        }
    }
}

impl Resolver for PricingResolver {
    fn resolve(
        &self,
        record: &mut Record,
        config: &PrepareConfig,
    ) -> Result<ResolveOutcome, RecordError> {
        let settings = &config.pricing;
        let entries: Vec<Value> = settings
            .fields
            .iter()
            .filter_map(|field| {
                extract(record, field)
                    .filter(|v| !is_empty_value(v))
                    .map(|v| Self::entry(field, &v, settings.currency.as_deref()))
            })
            .collect();

        if entries.is_empty() {
            return Ok(ResolveOutcome::Skipped);
        }

        insert_path(record, &settings.target_field, Value::Array(entries));
        Ok(ResolveOutcome::Applied)
    }
}
