// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Download stage

use async_trait::async_trait;
use std::sync::Arc;

use super::Pipe;
use crate::cache::Cache;
use crate::downloaders::DownloaderRegistry;
use crate::errors::FeedflowResult;
use crate::pipeline::{PipelineState, Stage};

pub struct DownloadPipe {
    downloaders: Arc<DownloaderRegistry>,
    cache: Option<Arc<dyn Cache>>,
}

impl DownloadPipe {
    pub fn new(downloaders: Arc<DownloaderRegistry>, cache: Option<Arc<dyn Cache>>) -> Self {
        Self { downloaders, cache }
    }

    fn cache_for(&self, state: &PipelineState) -> Option<&dyn Cache> {
        if state.config.options.cache {
            self.cache.as_deref()
        } else {
            None
        }
    }
}

#[async_trait]
impl Pipe for DownloadPipe {
    fn stage(&self) -> Stage {
        Stage::Download
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let request = &config.download;
        let cache = self.cache_for(state);

        if let Some(cache) = cache {
            match cache.get(request).await {
                Ok(Some(cached)) => {
                    tracing::info!(source = %request.source, bytes = cached.size, "download served from cache");
                    state.results.download = Some(cached);
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "cache lookup failed"),
            }
        }

        let downloader = self.downloaders.get(request.kind)?;
        tracing::debug!(downloader = downloader.name(), source = %request.source, "downloading");
        let result = downloader.download(request).await?;

        if let Some(cache) = cache {
            if let Err(e) = cache.store(request, &result).await {
                tracing::warn!(error = %e, "failed to cache download");
            }
        }

        state.results.download = Some(result);
        Ok(())
    }
}
