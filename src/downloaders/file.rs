// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Local file downloader

use async_trait::async_trait;
use std::path::PathBuf;

use super::{mime_from_name, DownloadConfig, Downloader};
use crate::errors::{FeedflowError, FeedflowResult};
use crate::pipeline::DownloadResult;

/// Reads the feed from the local filesystem
///
/// The source is a plain path or a `file://` URL.
pub struct FileDownloader;

impl FileDownloader {
    fn path(source: &str) -> PathBuf {
        match url::Url::parse(source) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .unwrap_or_else(|_| PathBuf::from(url.path())),
            _ => PathBuf::from(source),
        }
    }
}

#[async_trait]
impl Downloader for FileDownloader {
    fn name(&self) -> &'static str {
        "file"
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        &[]
    }

    async fn download(&self, config: &DownloadConfig) -> FeedflowResult<DownloadResult> {
        self.validate_options(&config.options)?;
        let path = Self::path(&config.source);

        let payload = tokio::fs::read(&path).await.map_err(|e| {
            FeedflowError::download(
                format!("Cannot read '{}': {}", path.display(), e),
                Some("Paths are resolved relative to the working directory".into()),
            )
        })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let mime_type = filename.as_deref().and_then(mime_from_name);

        Ok(DownloadResult::from_payload(payload, filename, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloaders::{DownloadOptions, DownloaderType};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let config = DownloadConfig::new(DownloaderType::File, path.to_string_lossy());
        let result = FileDownloader.download(&config).await.unwrap();

        assert!(result.success);
        assert_eq!(result.size, 8);
        assert_eq!(result.filename.as_deref(), Some("feed.csv"));
        assert_eq!(result.mime_type.as_deref(), Some("text/csv"));
        assert_eq!(result.payload.as_deref(), Some(&b"a,b\n1,2\n"[..]));
    }

    #[tokio::test]
    async fn test_file_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, "[]").unwrap();
        let url = url::Url::from_file_path(&path).unwrap();

        let config = DownloadConfig::new(DownloaderType::File, url.as_str());
        let result = FileDownloader.download(&config).await.unwrap();
        assert_eq!(result.size, 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_download_failure() {
        let config = DownloadConfig::new(DownloaderType::File, "/nonexistent/feed.csv");
        let err = FileDownloader.download(&config).await.unwrap_err();
        assert!(matches!(err, FeedflowError::DownloadFailed { .. }));
    }

    #[tokio::test]
    async fn test_rejects_options() {
        let mut config = DownloadConfig::new(DownloaderType::File, "feed.csv");
        config.options = DownloadOptions {
            timeout: Some(5),
            ..Default::default()
        };
        let err = FileDownloader.download(&config).await.unwrap_err();
        assert!(matches!(err, FeedflowError::InvalidOption { .. }));
    }
}
