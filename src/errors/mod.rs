// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Error types
//!
//! Two classes of failure exist in a run. [`FeedflowError`] is a stage-level
//! (or configuration-level) failure and halts the run. [`RecordError`] is a
//! failure of a single record; it is recorded as a [`RowError`] in the owning
//! stage's result and processing continues with the next record.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for feedflow operations
pub type FeedflowResult<T> = Result<T, FeedflowError>;

/// Main error type for feedflow
#[derive(Error, Debug, Diagnostic)]
pub enum FeedflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Strategy Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unsupported {kind} type '{name}'")]
    #[diagnostic(
        code(feedflow::unsupported_type),
        help("Valid {kind} types: {valid}")
    )]
    UnsupportedType {
        kind: String,
        name: String,
        valid: String,
    },

    #[error("Invalid option '{option}' for {strategy}: {reason}")]
    #[diagnostic(code(feedflow::invalid_option))]
    InvalidOption {
        strategy: String,
        option: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline configuration file not found: {path}")]
    #[diagnostic(
        code(feedflow::config_not_found),
        help("Export an existing pipeline with 'feedflow export' or write the YAML by hand")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(feedflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(feedflow::download_failed))]
    DownloadFailed {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(feedflow::read_failed))]
    ReadFailed { message: String },

    #[error("{stage} requires the {requires} result, which is not available")]
    #[diagnostic(
        code(feedflow::missing_upstream),
        help("Stages run strictly in order; check that the earlier stage completed")
    )]
    MissingUpstream { stage: String, requires: String },

    #[error("{message}")]
    #[diagnostic(code(feedflow::save_failed))]
    SaveFailed { message: String },

    #[error("{count} record error(s) with stop_on_error enabled (first: {first})")]
    #[diagnostic(
        code(feedflow::record_errors),
        help("Disable options.stop_on_error to keep record-level failures non-fatal")
    )]
    RecordErrors { count: usize, first: String },

    #[error("Stage timed out after {seconds}s")]
    #[diagnostic(code(feedflow::timeout))]
    Timeout { seconds: u64 },

    // ─────────────────────────────────────────────────────────────────────────
    // Cache Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Cache error: {message}")]
    #[diagnostic(code(feedflow::cache_error))]
    CacheError { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(feedflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(feedflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/Format Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(feedflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(feedflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(feedflow::json_error))]
    Json { message: String },

    #[error("CSV parsing error: {message}")]
    #[diagnostic(code(feedflow::csv_error))]
    Csv { message: String },

    #[error("XML parsing error: {message}")]
    #[diagnostic(code(feedflow::xml_error))]
    Xml { message: String },

    #[error("HTTP error: {message}")]
    #[diagnostic(code(feedflow::http_error))]
    Http { message: String },
}

impl From<std::io::Error> for FeedflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FeedflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FeedflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<csv::Error> for FeedflowError {
    fn from(e: csv::Error) -> Self {
        Self::Csv { message: e.to_string() }
    }
}

impl From<quick_xml::Error> for FeedflowError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml { message: e.to_string() }
    }
}

impl From<reqwest::Error> for FeedflowError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http { message: e.to_string() }
    }
}

impl FeedflowError {
    /// Build an unsupported-type error listing every valid identifier
    pub fn unsupported<I, S>(kind: &str, name: &str, valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let valid: Vec<String> = valid.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::UnsupportedType {
            kind: kind.to_string(),
            name: name.to_string(),
            valid: valid.join(", "),
        }
    }

    /// Build an invalid-option error
    pub fn invalid_option(strategy: &str, option: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            strategy: strategy.to_string(),
            option: option.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a download failure with an optional hint
    pub fn download(message: impl Into<String>, help: Option<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
            help,
        }
    }

    /// Build a read failure
    pub fn read(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }
}

/// Failure of a single record inside a stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("required field '{field}' is missing")]
    MissingRequiredField { field: String },

    #[error("operator '{operator}' on '{key}': {reason}")]
    Operator {
        key: String,
        operator: String,
        reason: String,
    },

    #[error("transformer '{transformer}' on '{field}': {reason}")]
    Transform {
        field: String,
        transformer: String,
        reason: String,
    },

    #[error("resolver '{resolver}': {reason}")]
    Resolver { resolver: String, reason: String },

    #[error("{0}")]
    Malformed(String),
}

/// A record-level error tagged with the zero-based row index it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub index: usize,
    pub message: String,
}

impl RowError {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.index, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_lists_valid_options() {
        let err = FeedflowError::unsupported("reader", "parquet", ["csv", "json"]);
        match &err {
            FeedflowError::UnsupportedType { valid, .. } => assert_eq!(valid, "csv, json"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Unsupported reader type 'parquet'");
    }

    #[test]
    fn test_row_error_display() {
        let err = RowError::new(3, "required field 'price' is missing");
        assert_eq!(err.to_string(), "row 3: required field 'price' is missing");
    }
}
