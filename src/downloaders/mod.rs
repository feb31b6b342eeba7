// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Feed downloaders
//!
//! Each downloader declares the options it accepts and validates their
//! ranges before any I/O happens. `http`, `https` and `file` are built in.
//! `ftp` and `sftp` own option handling but delegate the transfer itself to a
//! [`TransferClient`] registered with [`DownloaderRegistry::register_transfer_client`].

mod file;
mod http;
mod transfer;

pub use file::FileDownloader;
pub use http::HttpDownloader;
pub use transfer::{TransferClient, TransferDownloader, TransferRequest};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::{FeedflowError, FeedflowResult};
use crate::pipeline::DownloadResult;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between transport retries
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for the `retries` option
pub const MAX_RETRIES: u32 = 10;

/// Upper bound for the `timeout` option, in seconds
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Downloader identifiers
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
pub enum DownloaderType {
    Http,
    Https,
    Ftp,
    Sftp,
    File,
}

impl DownloaderType {
    pub fn parse(name: &str) -> FeedflowResult<Self> {
        name.parse()
            .map_err(|_| FeedflowError::unsupported("downloader", name, Self::iter()))
    }
}

/// Transport options; which ones apply depends on the downloader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Path to a private key (sftp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Extra attempts after a transport failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,

    /// Passive mode (ftp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
}

impl DownloadOptions {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }

    /// Names of the options that carry a value
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let flags = [
            ("host", self.host.is_some()),
            ("port", self.port.is_some()),
            ("username", self.username.is_some()),
            ("password", self.password.is_some()),
            ("private_key", self.private_key.is_some()),
            ("timeout", self.timeout.is_some()),
            ("retries", self.retries.is_some()),
            ("headers", !self.headers.is_empty()),
            ("method", self.method.is_some()),
            ("body", self.body.is_some()),
            ("verify_ssl", self.verify_ssl.is_some()),
            ("follow_redirects", self.follow_redirects.is_some()),
            ("passive", self.passive.is_some()),
        ];
        for (name, set) in flags {
            if set {
                names.push(name);
            }
        }
        names
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or(0)
    }
}

/// Download section of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(rename = "type")]
    pub kind: DownloaderType,

    /// URL or path of the feed
    pub source: String,

    #[serde(default, skip_serializing_if = "DownloadOptions::is_default")]
    pub options: DownloadOptions,
}

impl DownloadConfig {
    pub fn new(kind: DownloaderType, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            options: DownloadOptions::default(),
        }
    }
}

/// Range checks shared by every downloader
pub fn validate_common(strategy: &str, options: &DownloadOptions) -> FeedflowResult<()> {
    if let Some(port) = options.port {
        if !(1..=65535).contains(&port) {
            return Err(FeedflowError::invalid_option(
                strategy,
                "port",
                format!("{port} is outside 1-65535"),
            ));
        }
    }
    if let Some(timeout) = options.timeout {
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout) {
            return Err(FeedflowError::invalid_option(
                strategy,
                "timeout",
                format!("{timeout}s is outside 1-{MAX_TIMEOUT_SECS}"),
            ));
        }
    }
    if let Some(retries) = options.retries {
        if retries > MAX_RETRIES {
            return Err(FeedflowError::invalid_option(
                strategy,
                "retries",
                format!("{retries} exceeds the maximum of {MAX_RETRIES}"),
            ));
        }
    }
    Ok(())
}

/// Fetches a feed payload
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Identifier used in messages
    fn name(&self) -> &'static str;

    /// Options this downloader understands
    fn accepted_options(&self) -> &'static [&'static str];

    /// Reject unknown options and out-of-range values
    fn validate_options(&self, options: &DownloadOptions) -> FeedflowResult<()> {
        let accepted = self.accepted_options();
        if let Some(unknown) = options.present().into_iter().find(|o| !accepted.contains(o)) {
            return Err(FeedflowError::invalid_option(
                self.name(),
                unknown,
                format!("not accepted; valid options: {}", accepted.join(", ")),
            ));
        }
        validate_common(self.name(), options)
    }

    /// Fetch the payload described by `config`
    async fn download(&self, config: &DownloadConfig) -> FeedflowResult<DownloadResult>;
}

/// Registry mapping downloader identifiers to implementations
pub struct DownloaderRegistry {
    downloaders: HashMap<DownloaderType, Box<dyn Downloader>>,
}

impl DownloaderRegistry {
    pub fn new() -> Self {
        Self {
            downloaders: HashMap::new(),
        }
    }

    /// `http`, `https` and `file`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DownloaderType::Http, Box::new(HttpDownloader::http()));
        registry.register(DownloaderType::Https, Box::new(HttpDownloader::https()));
        registry.register(DownloaderType::File, Box::new(FileDownloader));
        registry
    }

    pub fn register(&mut self, kind: DownloaderType, downloader: Box<dyn Downloader>) {
        self.downloaders.insert(kind, downloader);
    }

    /// Enable `ftp` or `sftp` on top of the given client
    pub fn register_transfer_client(
        &mut self,
        protocol: DownloaderType,
        client: Arc<dyn TransferClient>,
    ) -> FeedflowResult<()> {
        let downloader = TransferDownloader::new(protocol, client)?;
        self.register(protocol, Box::new(downloader));
        Ok(())
    }

    pub fn get(&self, kind: DownloaderType) -> FeedflowResult<&dyn Downloader> {
        self.downloaders.get(&kind).map(|d| d.as_ref()).ok_or_else(|| {
            FeedflowError::unsupported("downloader", kind.as_ref(), self.registered())
        })
    }

    /// Registered identifiers, in declaration order
    pub fn registered(&self) -> Vec<String> {
        DownloaderType::iter()
            .filter(|k| self.downloaders.contains_key(k))
            .map(|k| k.to_string())
            .collect()
    }
}

impl Default for DownloaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Options accepted by the built-in downloader for `kind`
pub fn accepted_options(kind: DownloaderType) -> &'static [&'static str] {
    match kind {
        DownloaderType::Http | DownloaderType::Https => http::ACCEPTED,
        DownloaderType::Ftp => transfer::FTP_ACCEPTED,
        DownloaderType::Sftp => transfer::SFTP_ACCEPTED,
        DownloaderType::File => &[],
    }
}

/// Guess a MIME type from a file name
pub(crate) fn mime_from_name(name: &str) -> Option<String> {
    let extension = name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "txt" => "text/plain",
        "gz" => "application/gzip",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime.to_string())
}
