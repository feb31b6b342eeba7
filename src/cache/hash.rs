// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Content hashing for cache keys
//!
//! Uses BLAKE3 for fast, secure content hashing.

use blake3::Hasher;

use crate::downloaders::DownloadConfig;
use crate::errors::FeedflowError;

/// Content hasher for generating cache keys
pub struct ContentHasher {
    hasher: Hasher,
}

impl ContentHasher {
    /// Create a new content hasher
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Hash a download section: type, source and every option
    pub fn hash_download(mut self, request: &DownloadConfig) -> Result<String, FeedflowError> {
        self.hasher.update(request.kind.as_ref().as_bytes());
        self.hasher.update(request.source.as_bytes());

        let options_json = serde_json::to_string(&request.options).map_err(|e| FeedflowError::CacheError {
            message: format!("Failed to serialize download options: {}", e),
        })?;
        self.hasher.update(options_json.as_bytes());

        Ok(self.finalize())
    }

    /// Hash arbitrary bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and get the hash
    pub fn finalize(self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute a quick hash of a string
pub fn hash_string(s: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(s.as_bytes());
    hasher.finalize().to_hex().to_string()
}
