// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! HTTP(S) downloader

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{redirect, Client, Method, StatusCode};
use url::Url;

use super::{DownloadConfig, DownloadOptions, Downloader, RETRY_BACKOFF};
use crate::errors::{FeedflowError, FeedflowResult};
use crate::pipeline::DownloadResult;

pub(crate) const ACCEPTED: &[&str] = &[
    "username",
    "password",
    "timeout",
    "retries",
    "headers",
    "method",
    "body",
    "verify_ssl",
    "follow_redirects",
];

const MAX_REDIRECTS: usize = 10;

/// Downloads over HTTP or HTTPS with reqwest
pub struct HttpDownloader {
    scheme: &'static str,
}

impl HttpDownloader {
    pub fn http() -> Self {
        Self { scheme: "http" }
    }

    pub fn https() -> Self {
        Self { scheme: "https" }
    }

    fn parse_url(&self, source: &str) -> FeedflowResult<Url> {
        let url = Url::parse(source).map_err(|e| {
            FeedflowError::download(
                format!("Invalid URL '{source}': {e}"),
                Some(format!("Use a full {}:// URL", self.scheme)),
            )
        })?;
        if url.scheme() != self.scheme {
            return Err(FeedflowError::download(
                format!(
                    "URL '{source}' uses scheme '{}' but the downloader type is '{}'",
                    url.scheme(),
                    self.scheme
                ),
                Some(format!("Set download.type to '{}'", url.scheme())),
            ));
        }
        Ok(url)
    }

    fn method(&self, options: &DownloadOptions) -> FeedflowResult<Method> {
        match options.method.as_deref() {
            None => Ok(Method::GET),
            Some(name) => Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(|_| {
                FeedflowError::invalid_option(self.scheme, "method", format!("'{name}' is not an HTTP method"))
            }),
        }
    }

    fn client(&self, options: &DownloadOptions) -> FeedflowResult<Client> {
        let redirects = if options.follow_redirects.unwrap_or(true) {
            redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            redirect::Policy::none()
        };

        Client::builder()
            .timeout(options.timeout())
            .danger_accept_invalid_certs(!options.verify_ssl.unwrap_or(true))
            .redirect(redirects)
            .build()
            .map_err(FeedflowError::from)
    }

    fn build_request(
        &self,
        client: &Client,
        method: Method,
        url: Url,
        options: &DownloadOptions,
    ) -> FeedflowResult<reqwest::RequestBuilder> {
        let mut request = client.request(method, url);
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                FeedflowError::invalid_option(self.scheme, "headers", format!("invalid header name '{name}'"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                FeedflowError::invalid_option(self.scheme, "headers", format!("invalid value for '{name}'"))
            })?;
            request = request.header(name, value);
        }
        if let Some(username) = &options.username {
            request = request.basic_auth(username, options.password.as_ref());
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }
        Ok(request)
    }
}

fn retryable(status: StatusCode) -> bool {
    status.is_server_error()
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn name(&self) -> &'static str {
        self.scheme
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        ACCEPTED
    }

    async fn download(&self, config: &DownloadConfig) -> FeedflowResult<DownloadResult> {
        let options = &config.options;
        self.validate_options(options)?;
        let url = self.parse_url(&config.source)?;
        let method = self.method(options)?;
        let client = self.client(options)?;
        let attempts = options.retries() + 1;

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            let request = self.build_request(&client, method.clone(), url.clone(), options)?;

            match request.send().await {
                Ok(response) if retryable(response.status()) && attempt < attempts => {
                    tracing::warn!(url = %url, status = %response.status(), attempt, "server error, retrying");
                }
                Ok(response) => break response,
                Err(e) if attempt < attempts => {
                    tracing::warn!(url = %url, error = %e, attempt, "request failed, retrying");
                }
                Err(e) => {
                    return Err(FeedflowError::download(
                        format!("Request to {url} failed after {attempt} attempt(s): {e}"),
                        Some("Check the URL and network connectivity, or raise options.retries".into()),
                    ))
                }
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FeedflowError::download(
                format!("HTTP {status} from {url}"),
                None,
            ));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let filename = response
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let payload = response.bytes().await?.to_vec();
        tracing::debug!(url = %url, bytes = payload.len(), "download complete");

        Ok(DownloadResult::from_payload(payload, filename, mime_type))
    }
}
