// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! JSON reader

use serde_json::Value;

use super::{records_from_document, strip_bom, ReadOutput, Reader, ReaderOptions};
use crate::errors::{FeedflowError, FeedflowResult};

pub(crate) const ACCEPTED: &[&str] = &["entry_point"];

pub struct JsonReader;

impl Reader for JsonReader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        ACCEPTED
    }

    fn read(&self, payload: &[u8], options: &ReaderOptions) -> FeedflowResult<ReadOutput> {
        self.validate_options(options)?;
        let document: Value = serde_json::from_slice(strip_bom(payload))
            .map_err(|e| FeedflowError::read(format!("Invalid JSON: {e}")))?;
        records_from_document(&document, options.entry_point.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_array() {
        let output = JsonReader
            .read(br#"[{"id": 1}, {"id": 2}]"#, &ReaderOptions::default())
            .unwrap();
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[1]["id"], json!(2));
    }

    #[test]
    fn test_entry_point() {
        let options = ReaderOptions {
            entry_point: Some("response.vehicles".into()),
            ..Default::default()
        };
        let payload = br#"{"response": {"count": 1, "vehicles": [{"vin": "X"}]}}"#;
        let output = JsonReader.read(payload, &options).unwrap();
        assert_eq!(output.records[0]["vin"], json!("X"));
    }

    #[test]
    fn test_invalid_json_fails() {
        let err = JsonReader.read(b"{not json", &ReaderOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }
}
