//! Fake LLM provider for testing.
//!
//! Returns canned responses keyed by prompt substrings, so the fallback
//! stage can be exercised without a model server.

use super::{LlmError, LlmProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A fake LLM provider for testing.
///
/// Patterns are checked in insertion order against the lower-cased prompt;
/// the first one contained in the prompt wins.
#[derive(Debug)]
pub struct FakeProvider {
    responses: Vec<(String, String)>,
    default_response: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for FakeProvider {
    /// Answers "unknown" to anything not registered.
    fn default() -> Self {
        Self {
            responses: Vec::new(),
            default_response: Some("unknown".to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeProvider {
    /// Create a FakeProvider with no responses; unmatched prompts error.
    pub fn new() -> Self {
        Self {
            default_response: None,
            ..Self::default()
        }
    }

    /// Create a FakeProvider that returns `response` for prompts containing `prompt_contains`.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let mut provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .push((prompt_contains.to_lowercase(), response.to_string()));
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Sleep this long before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many completions have been requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let prompt_lower = prompt.to_lowercase();
        if let Some((_, response)) = self
            .responses
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(pattern.as_str()))
        {
            return Ok(response.clone());
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: no response configured for prompt (first 100 chars): {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_provider_matching() {
        let provider = FakeProvider::with_response("champignon", "mushroom");
        let result = provider
            .complete("Scanned ingredient: \"Bio EHL Champignon\"")
            .await
            .unwrap();
        assert_eq!(result, "mushroom");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_registered_pattern_wins() {
        let mut provider = FakeProvider::new();
        provider.add_response("tomate", "tomato");
        provider.add_response("cherry", "cherry");
        let result = provider.complete("tomate cherry 500g").await.unwrap();
        assert_eq!(result, "tomato");
    }

    #[tokio::test]
    async fn test_fake_provider_no_match() {
        let provider = FakeProvider::new();
        assert!(provider.complete("random prompt").await.is_err());
    }

    #[tokio::test]
    async fn test_default_answers_unknown() {
        let provider = FakeProvider::default();
        assert_eq!(provider.complete("anything").await.unwrap(), "unknown");
    }

    #[tokio::test]
    async fn test_custom_default_response() {
        let mut provider = FakeProvider::new().with_default_response("onion");
        provider.add_response("zwiebel", "Onion, red");

        assert_eq!(provider.complete("no pattern here").await.unwrap(), "onion");
        assert_eq!(provider.complete("ZWIEBEL rot").await.unwrap(), "Onion, red");
        assert_eq!(provider.calls(), 2);
    }
}
