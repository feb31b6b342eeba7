// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Stock id / VIN derivation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{has_value, PrepareConfig, ResolveOutcome, Resolver};
use crate::errors::RecordError;
use crate::extract::{extract, insert_path};
use crate::record::{value_to_string, Record};

/// Full length of a modern VIN
pub const VIN_LENGTH: usize = 17;

/// Shortest identifier accepted as a VIN (pre-1981 vehicles)
pub const MIN_VIN_LENGTH: usize = 11;

fn default_vin_field() -> String {
    "vin".to_string()
}

fn default_stock_id_field() -> String {
    "stock_id".to_string()
}

fn default_stock_id_length() -> usize {
    8
}

/// Field names used by both derivations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VinConfig {
    #[serde(default = "default_vin_field")]
    pub vin_field: String,

    #[serde(default = "default_stock_id_field")]
    pub stock_id_field: String,

    /// Number of trailing VIN characters forming the stock id
    #[serde(default = "default_stock_id_length")]
    pub stock_id_length: usize,
}

impl Default for VinConfig {
    fn default() -> Self {
        Self {
            vin_field: default_vin_field(),
            stock_id_field: default_stock_id_field(),
            stock_id_length: default_stock_id_length(),
        }
    }
}

impl VinConfig {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// Uppercase with everything but ASCII alphanumerics removed
fn normalize(raw: &Value) -> String {
    value_to_string(raw)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A 17 character identifier without the letters I, O and Q
pub fn is_valid_vin(candidate: &str) -> bool {
    candidate.len() == VIN_LENGTH
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, 'I' | 'O' | 'Q'))
}

/// Derives the stock id from the trailing characters of the VIN
pub struct StockIdFromVinResolver;

impl Resolver for StockIdFromVinResolver {
    fn resolve(
        &self,
        record: &mut Record,
        config: &PrepareConfig,
    ) -> Result<ResolveOutcome, RecordError> {
        let settings = &config.vin;
        if has_value(record, &settings.stock_id_field) {
            return Ok(ResolveOutcome::Skipped);
        }

        let Some(vin) = extract(record, &settings.vin_field).map(|v| normalize(&v)) else {
            return Ok(ResolveOutcome::Skipped);
        };
        if vin.len() < MIN_VIN_LENGTH.max(settings.stock_id_length) {
            return Ok(ResolveOutcome::Skipped);
        }

        let stock_id = &vin[vin.len() - settings.stock_id_length..];
        insert_path(record, &settings.stock_id_field, Value::String(stock_id.to_string()));
        Ok(ResolveOutcome::Applied)
    }
}

/// Uses the stock id as VIN when it has the shape of one
pub struct VinFromStockIdResolver;

impl Resolver for VinFromStockIdResolver {
    fn resolve(
        &self,
        record: &mut Record,
        config: &PrepareConfig,
    ) -> Result<ResolveOutcome, RecordError> {
        let settings = &config.vin;
        if has_value(record, &settings.vin_field) {
            return Ok(ResolveOutcome::Skipped);
        }

        let Some(stock_id) = extract(record, &settings.stock_id_field).map(|v| normalize(&v))
        else {
            return Ok(ResolveOutcome::Skipped);
        };
        if !is_valid_vin(&stock_id) {
            return Ok(ResolveOutcome::Skipped);
        }

        insert_path(record, &settings.vin_field, Value::String(stock_id));
        Ok(ResolveOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_stock_id_from_vin() {
        let mut r = record(json!({"vin": "wvw-zzz1kz 6w123456"}));
        let outcome = StockIdFromVinResolver
            .resolve(&mut r, &PrepareConfig::default())
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::Applied);
        assert_eq!(r["stock_id"], json!("6W123456"));
    }

    #[test]
    fn test_stock_id_skip_conditions() {
        let config = PrepareConfig::default();

        let mut present = record(json!({"vin": "WVWZZZ1KZ6W123456", "stock_id": "A1"}));
        assert_eq!(
            StockIdFromVinResolver.resolve(&mut present, &config).unwrap(),
            ResolveOutcome::Skipped
        );
        assert_eq!(present["stock_id"], json!("A1"));

        let mut short = record(json!({"vin": "ABC123"}));
        assert_eq!(
            StockIdFromVinResolver.resolve(&mut short, &config).unwrap(),
            ResolveOutcome::Skipped
        );

        let mut absent = record(json!({}));
        assert_eq!(
            StockIdFromVinResolver.resolve(&mut absent, &config).unwrap(),
            ResolveOutcome::Skipped
        );
    }

    #[test]
    fn test_vin_from_stock_id() {
        let config = PrepareConfig::default();

        let mut r = record(json!({"stock_id": "wvwzzz1kz6w123456"}));
        assert_eq!(
            VinFromStockIdResolver.resolve(&mut r, &config).unwrap(),
            ResolveOutcome::Applied
        );
        assert_eq!(r["vin"], json!("WVWZZZ1KZ6W123456"));

        let mut not_a_vin = record(json!({"stock_id": "A12345"}));
        assert_eq!(
            VinFromStockIdResolver.resolve(&mut not_a_vin, &config).unwrap(),
            ResolveOutcome::Skipped
        );

        let mut has_vin = record(json!({"vin": "X", "stock_id": "WVWZZZ1KZ6W123456"}));
        assert_eq!(
            VinFromStockIdResolver.resolve(&mut has_vin, &config).unwrap(),
            ResolveOutcome::Skipped
        );
    }

    #[test]
    fn test_vin_validation_rejects_ioq() {
        assert!(is_valid_vin("WVWZZZ1KZ6W123456"));
        assert!(!is_valid_vin("WVWZZZ1KZ6W12345O"));
        assert!(!is_valid_vin("WVWZZZ1KZ6W1234"));
    }
}
