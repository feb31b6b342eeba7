// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Per-stage result records
//!
//! Error lists on every result are append-only.

use serde::{Deserialize, Serialize};

use super::Stage;
use crate::errors::RowError;
use crate::filter::RuleStats;
use crate::record::Record;
use crate::resolvers::ResolverKind;

pub use crate::saver::SaveResult;

/// Outcome of the Download stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub success: bool,
    /// Payload size in bytes
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    /// Raw bytes; released once the Read stage has parsed them
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

impl DownloadResult {
    pub fn from_payload(payload: Vec<u8>, filename: Option<String>, mime_type: Option<String>) -> Self {
        Self {
            success: true,
            size: payload.len() as u64,
            filename,
            mime_type,
            from_cache: false,
            payload: Some(payload),
        }
    }

    /// Drop the raw bytes, keeping the metadata
    pub fn release_payload(&mut self) {
        self.payload = None;
    }
}

/// Outcome of the Read stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    pub records: Vec<Record>,
    /// Rows seen in the payload, including rows that could not be parsed
    pub total: usize,
    pub reader_type: String,
    pub errors: Vec<RowError>,
}

/// Outcome of the Filter stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub records: Vec<Record>,
    pub total: usize,
    pub filtered_count: usize,
    pub excluded_count: usize,
    pub rule_stats: Vec<RuleStats>,
    pub errors: Vec<RowError>,
}

/// Outcome of the Map stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    pub records: Vec<Record>,
    pub total: usize,
    pub mapped_count: usize,
    pub errors: Vec<RowError>,
}

/// Outcome of the ImagesPrepare stage; the records themselves stay on the mapping result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagesResult {
    /// Records whose image field was rewritten
    pub processed: usize,
    pub images_kept: usize,
    pub images_dropped: usize,
}

/// Per-resolver counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverStats {
    pub resolver: ResolverKind,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ResolverStats {
    pub fn new(resolver: ResolverKind) -> Self {
        Self {
            resolver,
            applied: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Outcome of the Prepare stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareResult {
    pub records: Vec<Record>,
    pub total: usize,
    /// Records at least one resolver changed
    pub prepared: usize,
    /// Records no resolver changed
    pub skipped: usize,
    pub resolver_stats: Vec<ResolverStats>,
    pub errors: Vec<RowError>,
}

/// Results of every completed stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<ReadResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<ImagesResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepare: Option<PrepareResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveResult>,
}

impl StageResults {
    /// Record-level errors a stage accumulated
    pub fn record_errors(&self, stage: Stage) -> &[RowError] {
        let errors = match stage {
            Stage::Download | Stage::ImagesPrepare => None,
            Stage::Read => self.read.as_ref().map(|r| &r.errors),
            Stage::Filter => self.filter.as_ref().map(|r| &r.errors),
            Stage::Map => self.mapping.as_ref().map(|r| &r.errors),
            Stage::Prepare => self.prepare.as_ref().map(|r| &r.errors),
            Stage::Save => self.save.as_ref().map(|r| &r.errors),
        };
        errors.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records a stage currently holds, if it produced any
    pub fn records(&self, stage: Stage) -> Option<&[Record]> {
        match stage {
            Stage::Download | Stage::Save => None,
            Stage::Read => self.read.as_ref().map(|r| r.records.as_slice()),
            Stage::Filter => self.filter.as_ref().map(|r| r.records.as_slice()),
            Stage::Map | Stage::ImagesPrepare => self.mapping.as_ref().map(|r| r.records.as_slice()),
            Stage::Prepare => self.prepare.as_ref().map(|r| r.records.as_slice()),
        }
    }

    /// Number of rows a stage produced
    pub fn rows(&self, stage: Stage) -> usize {
        match stage {
            Stage::Download => self.download.as_ref().map_or(0, |d| d.size as usize),
            Stage::ImagesPrepare => self.images.as_ref().map_or(0, |i| i.processed),
            Stage::Save => self.save.as_ref().map_or(0, |s| s.created + s.updated),
            other => self.records(other).map_or(0, <[Record]>::len),
        }
    }
}
