// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! FTP / SFTP downloaders over an injected transfer client

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{mime_from_name, DownloadConfig, Downloader, DownloaderType, RETRY_BACKOFF};
use crate::errors::{FeedflowError, FeedflowResult};
use crate::pipeline::DownloadResult;

pub(crate) const FTP_ACCEPTED: &[&str] = &["host", "port", "username", "password", "timeout", "retries", "passive"];
pub(crate) const SFTP_ACCEPTED: &[&str] = &[
    "host",
    "port",
    "username",
    "password",
    "private_key",
    "timeout",
    "retries",
];

/// Fully resolved transfer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub protocol: DownloaderType,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passive: bool,
    pub timeout: Duration,
}

/// Performs the actual file transfer for `ftp` / `sftp`
#[async_trait]
pub trait TransferClient: Send + Sync {
    async fn fetch(&self, request: &TransferRequest) -> FeedflowResult<Vec<u8>>;
}

/// Option handling and retries for one transfer protocol
pub struct TransferDownloader {
    protocol: DownloaderType,
    client: Arc<dyn TransferClient>,
}

impl TransferDownloader {
    pub fn new(protocol: DownloaderType, client: Arc<dyn TransferClient>) -> FeedflowResult<Self> {
        match protocol {
            DownloaderType::Ftp | DownloaderType::Sftp => Ok(Self { protocol, client }),
            other => Err(FeedflowError::unsupported(
                "transfer protocol",
                other.as_ref(),
                ["ftp", "sftp"],
            )),
        }
    }

    fn default_port(&self) -> u16 {
        match self.protocol {
            DownloaderType::Sftp => 22,
            _ => 21,
        }
    }

    /// Resolve host, port and path from a URL source or from the options
    pub fn request(&self, config: &DownloadConfig) -> FeedflowResult<TransferRequest> {
        let options = &config.options;
        let scheme = self.protocol.as_ref();

        let (url_host, url_port, path) = match Url::parse(&config.source) {
            Ok(url) if url.scheme() == scheme => (
                url.host_str().map(str::to_string),
                url.port(),
                url.path().to_string(),
            ),
            Ok(url) if url.has_host() => {
                return Err(FeedflowError::download(
                    format!("Source '{}' is not an {scheme}:// URL", config.source),
                    None,
                ))
            }
            _ => (None, None, config.source.clone()),
        };

        let host = options.host.clone().or(url_host).ok_or_else(|| {
            FeedflowError::invalid_option(scheme, "host", "required when the source is a bare path")
        })?;
        let port = match options.port {
            Some(port) => u16::try_from(port)
                .map_err(|_| FeedflowError::invalid_option(scheme, "port", "outside 1-65535"))?,
            None => url_port.unwrap_or(self.default_port()),
        };

        Ok(TransferRequest {
            protocol: self.protocol,
            host,
            port,
            path,
            username: options.username.clone(),
            password: options.password.clone(),
            private_key: options.private_key.clone(),
            passive: options.passive.unwrap_or(true),
            timeout: options.timeout(),
        })
    }
}

#[async_trait]
impl Downloader for TransferDownloader {
    fn name(&self) -> &'static str {
        match self.protocol {
            DownloaderType::Sftp => "sftp",
            _ => "ftp",
        }
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        match self.protocol {
            DownloaderType::Sftp => SFTP_ACCEPTED,
            _ => FTP_ACCEPTED,
        }
    }

    async fn download(&self, config: &DownloadConfig) -> FeedflowResult<DownloadResult> {
        self.validate_options(&config.options)?;
        let request = self.request(config)?;
        let attempts = config.options.retries() + 1;

        let mut attempt = 0;
        let payload = loop {
            attempt += 1;
            match self.client.fetch(&request).await {
                Ok(payload) => break payload,
                Err(e) if attempt < attempts => {
                    tracing::warn!(host = %request.host, error = %e, attempt, "transfer failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => {
                    return Err(FeedflowError::download(
                        format!(
                            "{} transfer of '{}' from {} failed after {attempt} attempt(s): {e}",
                            self.name(),
                            request.path,
                            request.host
                        ),
                        None,
                    ))
                }
            }
        };

        let filename = request
            .path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let mime_type = filename.as_deref().and_then(mime_from_name);
        Ok(DownloadResult::from_payload(payload, filename, mime_type))
    }
}
