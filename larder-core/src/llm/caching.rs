//! On-disk response cache for LLM providers.
//!
//! Batch runs over the same receipts ask the same questions repeatedly.
//! Caching the answers makes re-runs fast and keeps the fallback stage
//! reproducible once a label has been classified.

use super::{LlmError, LlmProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A caching wrapper around any LLM provider.
///
/// Layout: `{cache_dir}/{provider}/{model}/{hash[0:2]}/{hash}.json`, where
/// `hash` is the SHA-256 of the prompt.
#[derive(Debug)]
pub struct CachingProvider {
    inner: Box<dyn LlmProvider>,
    cache_dir: PathBuf,
}

/// Cached response with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    provider: String,
    model: String,
    cached_at: DateTime<Utc>,
    response: String,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_responses: usize,
}

impl CachingProvider {
    pub fn new(inner: Box<dyn LlmProvider>, cache_dir: PathBuf) -> Self {
        Self { inner, cache_dir }
    }

    fn model_dir(&self) -> PathBuf {
        self.cache_dir
            .join(self.inner.provider_name())
            .join(self.inner.model_name().replace(['/', ':'], "_"))
    }

    fn entry_path(&self, prompt: &str) -> PathBuf {
        let hash = hex::encode(Sha256::digest(prompt.as_bytes()));
        self.model_dir()
            .join(&hash[..2])
            .join(format!("{}.json", hash))
    }

    async fn read_entry(&self, path: &Path) -> Option<String> {
        let content = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str::<CachedResponse>(&content) {
            Ok(cached) => Some(cached.response),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt LLM cache entry");
                None
            }
        }
    }

    async fn write_entry(&self, path: &Path, response: &str) -> Result<(), LlmError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LlmError::CacheError(e.to_string()))?;
        }

        let cached = CachedResponse {
            provider: self.inner.provider_name().to_string(),
            model: self.inner.model_name().to_string(),
            cached_at: Utc::now(),
            response: response.to_string(),
        };
        let content = serde_json::to_string_pretty(&cached)
            .map_err(|e| LlmError::CacheError(e.to_string()))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| LlmError::CacheError(e.to_string()))
    }

    /// Count cached responses for the wrapped provider and model.
    pub fn cache_stats(&self) -> CacheStats {
        fn count_json_files(dir: &Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .map(|path| {
                    if path.is_dir() {
                        count_json_files(&path)
                    } else if path.extension().is_some_and(|ext| ext == "json") {
                        1
                    } else {
                        0
                    }
                })
                .sum()
        }

        CacheStats {
            cached_responses: count_json_files(&self.model_dir()),
        }
    }
}

#[async_trait]
impl LlmProvider for CachingProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let path = self.entry_path(prompt);

        if let Some(cached) = self.read_entry(&path).await {
            tracing::debug!(
                provider = self.inner.provider_name(),
                model = self.inner.model_name(),
                "LLM cache hit"
            );
            return Ok(cached);
        }

        let response = self.inner.complete(prompt).await?;

        // Best-effort; a failed write only costs a future cache miss.
        if let Err(e) = self.write_entry(&path, &response).await {
            tracing::warn!(error = %e, "Failed to cache LLM response");
        }

        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
