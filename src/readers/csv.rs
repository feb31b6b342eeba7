// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! CSV reader

use serde_json::Value;

use super::{strip_bom, ReadOutput, Reader, ReaderOptions};
use crate::errors::{FeedflowError, FeedflowResult, RowError};
use crate::record::Record;

pub(crate) const ACCEPTED: &[&str] = &["delimiter", "enclosure", "escape"];

/// Reads delimited text with a header row; every value is a string
pub struct CsvReader;

fn single_byte(option: &str, value: &Option<String>, default: u8) -> FeedflowResult<u8> {
    let Some(value) = value else {
        return Ok(default);
    };
    let value = match value.as_str() {
        "\\t" => "\t",
        other => other,
    };
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(FeedflowError::invalid_option(
            "csv",
            option,
            format!("'{value}' must be a single ASCII character"),
        )),
    }
}

impl Reader for CsvReader {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        ACCEPTED
    }

    fn read(&self, payload: &[u8], options: &ReaderOptions) -> FeedflowResult<ReadOutput> {
        self.validate_options(options)?;
        let delimiter = single_byte("delimiter", &options.delimiter, b',')?;
        let quote = single_byte("enclosure", &options.enclosure, b'"')?;

        let mut builder = ::csv::ReaderBuilder::new();
        builder
            .delimiter(delimiter)
            .quote(quote)
            .has_headers(true)
            .flexible(true);
        if options.escape.is_some() {
            let escape = single_byte("escape", &options.escape, b'\\')?;
            if escape != quote {
                builder.escape(Some(escape)).double_quote(false);
            }
        }

        let mut reader = builder.from_reader(strip_bom(payload));
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FeedflowError::read(format!("Cannot read CSV header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(FeedflowError::read("CSV payload has no header row"));
        }

        let mut output = ReadOutput::default();
        for (index, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    output.errors.push(RowError::new(index, e.to_string()));
                    continue;
                }
            };
            if row.len() != headers.len() {
                output.errors.push(RowError::new(
                    index,
                    format!("expected {} fields, found {}", headers.len(), row.len()),
                ));
                continue;
            }

            let record: Record = headers
                .iter()
                .zip(row.iter())
                .map(|(key, value)| (key.clone(), Value::String(value.to_string())))
                .collect();
            output.records.push(record);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read(payload: &str, options: ReaderOptions) -> ReadOutput {
        CsvReader.read(payload.as_bytes(), &options).unwrap()
    }

    #[test]
    fn test_reads_rows_in_order() {
        let output = read("make,model\nVolvo,XC60\nAudi,A4\n", ReaderOptions::default());
        assert_eq!(output.records.len(), 2);
        assert_eq!(
            Value::Object(output.records[1].clone()),
            json!({"make": "Audi", "model": "A4"})
        );
        let keys: Vec<&String> = output.records[0].keys().collect();
        assert_eq!(keys, ["make", "model"]);
    }

    #[test]
    fn test_custom_delimiter_and_enclosure() {
        let options = ReaderOptions {
            delimiter: Some(";".into()),
            enclosure: Some("'".into()),
            ..Default::default()
        };
        let output = read("name;note\n'Smith; John';'ok'\n", options);
        assert_eq!(output.records[0]["name"], json!("Smith; John"));
    }

    #[test]
    fn test_tab_delimiter() {
        let options = ReaderOptions {
            delimiter: Some("\\t".into()),
            ..Default::default()
        };
        let output = read("a\tb\n1\t2\n", options);
        assert_eq!(output.records[0]["b"], json!("2"));
    }

    #[test]
    fn test_escape_character() {
        let options = ReaderOptions {
            escape: Some("\\".into()),
            ..Default::default()
        };
        let output = read("title\n\"19\\\" wheels\"\n", options);
        assert_eq!(output.records[0]["title"], json!("19\" wheels"));
    }

    #[test]
    fn test_ragged_row_is_row_error() {
        let output = read("a,b\n1,2\n3\n4,5\n", ReaderOptions::default());
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.errors, vec![RowError::new(1, "expected 2 fields, found 1")]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let output = read("\u{feff}id\n7\n", ReaderOptions::default());
        assert_eq!(output.records[0]["id"], json!("7"));
    }

    #[test]
    fn test_empty_payload_fails() {
        assert!(CsvReader.read(b"", &ReaderOptions::default()).is_err());
    }

    #[test]
    fn test_multi_char_delimiter_rejected() {
        let options = ReaderOptions {
            delimiter: Some("||".into()),
            ..Default::default()
        };
        let err = CsvReader.read(b"a||b\n", &options).unwrap_err();
        assert!(matches!(err, FeedflowError::InvalidOption { .. }));
    }
}
