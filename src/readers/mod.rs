// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Feed readers
//!
//! A reader turns the raw payload into an ordered list of records. A payload
//! that cannot be parsed at all is a stage failure; a single bad row is a
//! row error and the rest of the feed is still read.

mod csv;
mod json;
mod xml;
mod yaml;

pub use self::csv::CsvReader;
pub use self::json::JsonReader;
pub use self::xml::XmlReader;
pub use self::yaml::YamlReader;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::{FeedflowError, FeedflowResult, RowError};
use crate::extract::extract_value;
use crate::record::Record;

/// Reader identifiers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReaderType {
    Csv,
    Json,
    Xml,
    Yaml,
}

impl ReaderType {
    pub fn parse(name: &str) -> FeedflowResult<Self> {
        name.parse()
            .map_err(|_| FeedflowError::unsupported("reader", name, Self::iter()))
    }
}

/// Format options; which ones apply depends on the reader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// CSV field delimiter (single character, default `,`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    /// CSV quote character (default `"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosure: Option<String>,

    /// CSV escape character (default: doubled quotes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<String>,

    /// Dot path to the record list (JSON, XML, YAML)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    /// Keep the XML root element as the top-level key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_root: Option<bool>,
}

impl ReaderOptions {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }

    pub fn present(&self) -> Vec<&'static str> {
        [
            ("delimiter", self.delimiter.is_some()),
            ("enclosure", self.enclosure.is_some()),
            ("escape", self.escape.is_some()),
            ("entry_point", self.entry_point.is_some()),
            ("keep_root", self.keep_root.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Read section of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadConfig {
    #[serde(rename = "type")]
    pub kind: ReaderType,

    #[serde(default, skip_serializing_if = "ReaderOptions::is_default")]
    pub options: ReaderOptions,
}

impl ReadConfig {
    pub fn new(kind: ReaderType) -> Self {
        Self {
            kind,
            options: ReaderOptions::default(),
        }
    }
}

/// Records parsed from a payload, plus the rows that could not be parsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOutput {
    pub records: Vec<Record>,
    pub errors: Vec<RowError>,
}

/// Parses a payload into records
pub trait Reader: Send + Sync {
    fn name(&self) -> &'static str;

    fn accepted_options(&self) -> &'static [&'static str];

    fn validate_options(&self, options: &ReaderOptions) -> FeedflowResult<()> {
        let accepted = self.accepted_options();
        match options.present().into_iter().find(|o| !accepted.contains(o)) {
            Some(unknown) => Err(FeedflowError::invalid_option(
                self.name(),
                unknown,
                format!("not accepted; valid options: {}", accepted.join(", ")),
            )),
            None => Ok(()),
        }
    }

    fn read(&self, payload: &[u8], options: &ReaderOptions) -> FeedflowResult<ReadOutput>;
}

/// Registry mapping reader identifiers to implementations
pub struct ReaderRegistry {
    readers: HashMap<ReaderType, Box<dyn Reader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self {
            readers: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ReaderType::Csv, Box::new(CsvReader));
        registry.register(ReaderType::Json, Box::new(JsonReader));
        registry.register(ReaderType::Xml, Box::new(XmlReader));
        registry.register(ReaderType::Yaml, Box::new(YamlReader));
        registry
    }

    pub fn register(&mut self, kind: ReaderType, reader: Box<dyn Reader>) {
        self.readers.insert(kind, reader);
    }

    pub fn get(&self, kind: ReaderType) -> FeedflowResult<&dyn Reader> {
        self.readers.get(&kind).map(|r| r.as_ref()).ok_or_else(|| {
            let registered: Vec<String> = ReaderType::iter()
                .filter(|k| self.readers.contains_key(k))
                .map(|k| k.to_string())
                .collect();
            FeedflowError::unsupported("reader", kind.as_ref(), registered)
        })
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Options accepted by the built-in reader for `kind`
pub fn accepted_options(kind: ReaderType) -> &'static [&'static str] {
    match kind {
        ReaderType::Csv => self::csv::ACCEPTED,
        ReaderType::Json => self::json::ACCEPTED,
        ReaderType::Xml => self::xml::ACCEPTED,
        ReaderType::Yaml => self::yaml::ACCEPTED,
    }
}

/// Strip a leading UTF-8 byte order mark
pub(crate) fn strip_bom(payload: &[u8]) -> &[u8] {
    payload.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(payload)
}

/// Resolve the entry point in a parsed document and turn it into records
///
/// A list yields one record per object element; non-object elements become
/// row errors. A single object yields one record. Anything else is a failure.
pub(crate) fn records_from_document(
    document: &Value,
    entry_point: Option<&str>,
) -> FeedflowResult<ReadOutput> {
    let target = match entry_point {
        Some(path) => extract_value(document, path)
            .ok_or_else(|| FeedflowError::read(format!("Entry point '{path}' not found")))?,
        None => document.clone(),
    };

    match target {
        Value::Array(items) => {
            let mut output = ReadOutput::default();
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(record) => output.records.push(record),
                    other => output.errors.push(RowError::new(
                        index,
                        format!("expected an object, found {}", type_name(&other)),
                    )),
                }
            }
            Ok(output)
        }
        Value::Object(record) => Ok(ReadOutput {
            records: vec![record],
            errors: Vec::new(),
        }),
        other => Err(FeedflowError::read(format!(
            "Expected a list of records, found {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
