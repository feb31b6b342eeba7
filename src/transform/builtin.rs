// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Built-in transformers

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt::Write;

use super::{TransformOptions, Transformer, DEFAULT_DATE_FORMAT, DEFAULT_JOIN_SEPARATOR};
use crate::record::{value_to_f64, value_to_string};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y%m%d"];

/// Apply `f` to a scalar, or to each element of an array
fn map_scalar(value: Value, f: impl Fn(Value) -> Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(f).collect()),
        other => f(other),
    }
}

/// Identity
pub struct NoneTransformer;

impl Transformer for NoneTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(value)
    }
}

/// Strip surrounding whitespace
pub struct TrimTransformer;

impl Transformer for TrimTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(map_scalar(value, |v| match v {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        }))
    }
}

/// Uppercase strings
pub struct UpperTransformer;

impl Transformer for UpperTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(map_scalar(value, |v| match v {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        }))
    }
}

/// Lowercase strings
pub struct LowerTransformer;

impl Transformer for LowerTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(map_scalar(value, |v| match v {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        }))
    }
}

/// Lenient numeric parse: spaces removed, a lone comma read as decimal point
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            let normalized = if compact.contains(',') && !compact.contains('.') {
                compact.replacen(',', ".", 1)
            } else {
                compact.replace(',', "")
            };
            normalized.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        other => value_to_f64(other),
    }
}

/// Convert to an integer (truncating); non-numeric input becomes null
pub struct IntTransformer;

impl Transformer for IntTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(map_scalar(value, |v| match parse_number(&v) {
            Some(n) => Value::from(n.trunc() as i64),
            None => Value::Null,
        }))
    }
}

/// Convert to a float; non-numeric input becomes null
pub struct FloatTransformer;

impl Transformer for FloatTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(map_scalar(value, |v| match parse_number(&v) {
            Some(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            None => Value::Null,
        }))
    }
}

/// Convert to a boolean
pub struct BoolTransformer;

impl Transformer for BoolTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(map_scalar(value, |v| {
            let truthy = match &v {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => matches!(
                    s.trim().to_lowercase().as_str(),
                    "1" | "true" | "yes" | "y" | "on"
                ),
                _ => false,
            };
            Value::Bool(truthy)
        }))
    }
}

fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0).map(|dt| dt.naive_utc()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_utc());
            }
            if let Some(dt) = DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            {
                return Some(dt);
            }
            if let Some(date) = DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
            {
                return date.and_hms_opt(0, 0, 0);
            }
            s.parse::<i64>()
                .ok()
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.naive_utc())
        }
        _ => None,
    }
}

/// Whether chrono can render `format` (no unknown `%` specifiers)
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn format_datetime(dt: &NaiveDateTime, format: &str) -> Result<Value, String> {
    let mut out = String::new();
    write!(out, "{}", dt.format(format))
        .map_err(|_| format!("invalid date_format '{format}'"))?;
    Ok(Value::String(out))
}

/// Normalize dates; unparseable input becomes null
pub struct DateTransformer;

impl Transformer for DateTransformer {
    fn transform(&self, value: Value, options: &TransformOptions) -> Result<Value, String> {
        let format = options.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
        let render = |v: Value| match parse_datetime(&v) {
            Some(dt) => format_datetime(&dt, format),
            None => Ok(Value::Null),
        };
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(render)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => render(other),
        }
    }
}

/// First element of an array; scalars pass through
pub struct ArrayFirstTransformer;

impl Transformer for ArrayFirstTransformer {
    fn transform(&self, value: Value, _options: &TransformOptions) -> Result<Value, String> {
        Ok(match value {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
            other => other,
        })
    }

    fn accepts_empty(&self) -> bool {
        true
    }
}

/// Join array elements into one string
pub struct ArrayJoinTransformer;

impl Transformer for ArrayJoinTransformer {
    fn transform(&self, value: Value, options: &TransformOptions) -> Result<Value, String> {
        let separator = options.separator.as_deref().unwrap_or(DEFAULT_JOIN_SEPARATOR);
        Ok(match value {
            Value::Array(items) => Value::String(
                items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(value_to_string)
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
            Value::Null => Value::String(String::new()),
            other => Value::String(value_to_string(&other)),
        })
    }

    fn accepts_empty(&self) -> bool {
        true
    }
}
