// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Caching layer for downloaded feeds
//!
//! Payloads are keyed by a content hash of the download section, so a change
//! to the source or any transport option misses the cache.

mod filesystem;
mod hash;

pub use filesystem::FilesystemCache;
pub use hash::{hash_string, ContentHasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::downloaders::DownloadConfig;
use crate::errors::FeedflowError;
use crate::pipeline::DownloadResult;

/// Trait for download cache implementations
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the cached download for a request
    async fn get(&self, request: &DownloadConfig) -> Result<Option<DownloadResult>, FeedflowError>;

    /// Store a successful download
    async fn store(&self, request: &DownloadConfig, result: &DownloadResult) -> Result<(), FeedflowError>;

    /// Drop the entry for a request
    async fn invalidate(&self, request: &DownloadConfig) -> Result<(), FeedflowError>;

    /// Clear all cached payloads
    async fn clear(&self) -> Result<(), FeedflowError>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats, FeedflowError>;
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Oldest entry timestamp
    pub oldest_entry: Option<SystemTime>,
    /// Newest entry timestamp
    pub newest_entry: Option<SystemTime>,
}

impl CacheStats {
    /// Format size for display
    pub fn formatted_size(&self) -> String {
        format_bytes(self.size_bytes)
    }
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Metadata stored next to a cached payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// When the entry was cached
    pub timestamp: SystemTime,
    /// Source the payload came from
    pub source: String,
    /// Cache key (content hash)
    pub cache_key: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_size() {
        let stats = CacheStats {
            size_bytes: 1536,
            ..Default::default()
        };
        assert_eq!(stats.formatted_size(), "1.50 KB");
        assert_eq!(format_bytes(12), "12 bytes");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
