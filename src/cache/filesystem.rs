// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Filesystem-based cache implementation
//!
//! Each entry is a JSON metadata file plus a `.bin` payload file, stored
//! under a two-character prefix directory of the cache key.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::{Cache, CacheStats, CachedEntry, ContentHasher};
use crate::downloaders::DownloadConfig;
use crate::errors::FeedflowError;
use crate::pipeline::DownloadResult;

/// Filesystem-based cache
pub struct FilesystemCache {
    /// Cache directory
    cache_dir: PathBuf,
    /// Entries older than this are treated as misses
    ttl: Option<Duration>,
}

impl FilesystemCache {
    /// Create a new filesystem cache
    pub fn new(cache_dir: PathBuf) -> Result<Self, FeedflowError> {
        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir).map_err(|e| FeedflowError::CacheError {
                message: format!("Failed to create cache directory: {}", e),
            })?;
        }

        Ok(Self { cache_dir, ttl: None })
    }

    /// Create cache with default directory
    pub fn default_cache(base_dir: &Path) -> Result<Self, FeedflowError> {
        Self::new(base_dir.join(".feedflow").join("cache"))
    }

    /// Expire entries after `ttl`
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_key(&self, request: &DownloadConfig) -> Result<String, FeedflowError> {
        ContentHasher::new().hash_download(request)
    }

    /// Paths of the metadata and payload files for a key
    fn cache_paths(&self, key: &str) -> (PathBuf, PathBuf) {
        // Use first 2 chars as directory for better filesystem performance
        let (prefix, rest) = key.split_at(2.min(key.len()));
        let dir = self.cache_dir.join(prefix);
        (dir.join(format!("{}.json", rest)), dir.join(format!("{}.bin", rest)))
    }

    fn expired(&self, entry: &CachedEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry
                .timestamp
                .elapsed()
                .map(|age| age > ttl)
                .unwrap_or(false),
            None => false,
        }
    }

    async fn remove_entry(meta: &Path, payload: &Path) {
        let _ = tokio::fs::remove_file(meta).await;
        let _ = tokio::fs::remove_file(payload).await;
    }

    /// List all cache entries
    fn list_entries(&self) -> Result<Vec<CachedEntry>, FeedflowError> {
        let mut entries = Vec::new();

        if !self.cache_dir.exists() {
            return Ok(entries);
        }

        for prefix_dir in std::fs::read_dir(&self.cache_dir).map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to read cache directory: {}", e),
        })? {
            let prefix_dir = prefix_dir
                .map_err(|e| FeedflowError::CacheError {
                    message: format!("Failed to read cache entry: {}", e),
                })?
                .path();

            if !prefix_dir.is_dir() {
                continue;
            }

            for entry_file in std::fs::read_dir(&prefix_dir).map_err(|e| FeedflowError::CacheError {
                message: format!("Failed to read cache subdirectory: {}", e),
            })? {
                let entry_file = entry_file
                    .map_err(|e| FeedflowError::CacheError {
                        message: format!("Failed to read cache file: {}", e),
                    })?
                    .path();

                if entry_file.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                if let Ok(content) = std::fs::read_to_string(&entry_file) {
                    if let Ok(entry) = serde_json::from_str::<CachedEntry>(&content) {
                        entries.push(entry);
                    }
                }
            }
        }

        Ok(entries)
    }

    /// Calculate directory size recursively
    fn dir_size(path: &Path) -> Result<u64, FeedflowError> {
        let mut size = 0;

        if path.is_file() {
            return Ok(path.metadata().map(|m| m.len()).unwrap_or(0));
        }

        for entry in std::fs::read_dir(path).map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to read directory: {}", e),
        })? {
            let entry = entry.map_err(|e| FeedflowError::CacheError {
                message: format!("Failed to read entry: {}", e),
            })?;

            let path = entry.path();
            if path.is_dir() {
                size += Self::dir_size(&path)?;
            } else {
                size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(size)
    }
}

#[async_trait]
impl Cache for FilesystemCache {
    async fn get(&self, request: &DownloadConfig) -> Result<Option<DownloadResult>, FeedflowError> {
        let key = self.cache_key(request)?;
        let (meta_path, payload_path) = self.cache_paths(&key);

        if !meta_path.exists() || !payload_path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&meta_path).await.map_err(|e| {
            FeedflowError::CacheError {
                message: format!("Failed to read cache entry: {}", e),
            }
        })?;

        let entry: CachedEntry = serde_json::from_str(&content).map_err(|e| {
            FeedflowError::CacheError {
                message: format!("Failed to parse cache entry: {}", e),
            }
        })?;

        if self.expired(&entry) {
            tracing::debug!(source = %entry.source, "cache entry expired");
            Self::remove_entry(&meta_path, &payload_path).await;
            return Ok(None);
        }

        let payload = tokio::fs::read(&payload_path).await.map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to read cached payload: {}", e),
        })?;

        // Truncated payload: drop the entry
        if payload.len() as u64 != entry.size {
            Self::remove_entry(&meta_path, &payload_path).await;
            return Ok(None);
        }

        let mut result = DownloadResult::from_payload(payload, entry.filename, entry.mime_type);
        result.from_cache = true;
        Ok(Some(result))
    }

    async fn store(&self, request: &DownloadConfig, result: &DownloadResult) -> Result<(), FeedflowError> {
        let Some(payload) = result.payload.as_deref() else {
            return Ok(());
        };

        let key = self.cache_key(request)?;
        let (meta_path, payload_path) = self.cache_paths(&key);

        if let Some(parent) = meta_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FeedflowError::CacheError {
                    message: format!("Failed to create cache directory: {}", e),
                }
            })?;
        }

        let entry = CachedEntry {
            timestamp: SystemTime::now(),
            source: request.source.clone(),
            cache_key: key,
            filename: result.filename.clone(),
            mime_type: result.mime_type.clone(),
            size: payload.len() as u64,
        };

        let json = serde_json::to_string_pretty(&entry).map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to serialize cache entry: {}", e),
        })?;

        tokio::fs::write(&payload_path, payload).await.map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to write cached payload: {}", e),
        })?;
        tokio::fs::write(&meta_path, json).await.map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to write cache entry: {}", e),
        })?;

        Ok(())
    }

    async fn invalidate(&self, request: &DownloadConfig) -> Result<(), FeedflowError> {
        let key = self.cache_key(request)?;
        let (meta_path, payload_path) = self.cache_paths(&key);
        Self::remove_entry(&meta_path, &payload_path).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), FeedflowError> {
        if self.cache_dir.exists() {
            tokio::fs::remove_dir_all(&self.cache_dir).await.map_err(|e| {
                FeedflowError::CacheError {
                    message: format!("Failed to clear cache: {}", e),
                }
            })?;

            tokio::fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
                FeedflowError::CacheError {
                    message: format!("Failed to recreate cache directory: {}", e),
                }
            })?;
        }

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, FeedflowError> {
        let entries = self.list_entries()?;

        let mut stats = CacheStats {
            entries: entries.len(),
            size_bytes: 0,
            oldest_entry: None,
            newest_entry: None,
        };

        for entry in &entries {
            match stats.oldest_entry {
                None => stats.oldest_entry = Some(entry.timestamp),
                Some(oldest) if entry.timestamp < oldest => {
                    stats.oldest_entry = Some(entry.timestamp)
                }
                _ => {}
            }

            match stats.newest_entry {
                None => stats.newest_entry = Some(entry.timestamp),
                Some(newest) if entry.timestamp > newest => {
                    stats.newest_entry = Some(entry.timestamp)
                }
                _ => {}
            }
        }

        if self.cache_dir.exists() {
            stats.size_bytes = Self::dir_size(&self.cache_dir)?;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloaders::DownloaderType;
    use tempfile::TempDir;

    fn request() -> DownloadConfig {
        DownloadConfig::new(DownloaderType::Https, "https://example.com/feed.csv")
    }

    fn download() -> DownloadResult {
        DownloadResult::from_payload(
            b"a,b\n1,2\n".to_vec(),
            Some("feed.csv".into()),
            Some("text/csv".into()),
        )
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store(&request(), &download()).await.unwrap();

        let cached = cache.get(&request()).await.unwrap().unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.payload.as_deref(), Some(&b"a,b\n1,2\n"[..]));
        assert_eq!(cached.filename.as_deref(), Some("feed.csv"));
        assert_eq!(cached.size, 8);
    }

    #[tokio::test]
    async fn test_different_request_misses() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();
        cache.store(&request(), &download()).await.unwrap();

        let mut other = request();
        other.options.timeout = Some(5);
        assert!(cache.get(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store(&request(), &download()).await.unwrap();
        assert!(cache.get(&request()).await.unwrap().is_some());

        cache.invalidate(&request()).await.unwrap();
        assert!(cache.get(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_misses() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf())
            .unwrap()
            .with_ttl(Some(Duration::ZERO));

        cache.store(&request(), &download()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FilesystemCache::new(temp_dir.path().to_path_buf()).unwrap();

        cache.store(&request(), &download()).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert!(stats.size_bytes >= 8);

        cache.clear().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
    }
}
