//! LLM provider abstraction for the fallback classification stage.
//!
//! The cascade only ever asks a provider for a short completion. Providers
//! are trait objects so the stage can run against a local Ollama server, a
//! disk cache, or canned responses in tests.

mod caching;
mod fake;
mod ollama;

pub use caching::{CacheStats, CachingProvider};
pub use fake::FakeProvider;
pub use ollama::OllamaProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::config::{LlmConfig, ProviderKind};

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

/// Trait for LLM providers.
///
/// Implementations must be thread-safe; many classifications share one
/// provider concurrently.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send a prompt to the LLM and get a text response.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Get the provider name (e.g., "ollama", "fake").
    fn provider_name(&self) -> &'static str;

    /// Get the model name (e.g., "llama3.1:8b").
    fn model_name(&self) -> &str;
}

/// Build the configured provider, wrapped in a disk cache when one is set.
///
/// Returns `Ok(None)` when the fallback stage is disabled.
pub fn create_provider(config: &LlmConfig) -> Result<Option<Box<dyn LlmProvider>>, LlmError> {
    let provider: Box<dyn LlmProvider> = match config.provider {
        ProviderKind::None => return Ok(None),
        ProviderKind::Fake => Box::new(FakeProvider::default()),
        ProviderKind::Ollama => Box::new(
            OllamaProvider::new(config.endpoint.clone(), config.model.clone())
                .map_err(|e| LlmError::NotConfigured(e.to_string()))?,
        ),
    };

    Ok(Some(match &config.cache_dir {
        Some(dir) => Box::new(CachingProvider::new(provider, dir.clone())),
        None => provider,
    }))
}
