//! External classifier consulted when fuzzy matching is inconclusive.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::prompt::{render_normalize_prompt, UNKNOWN_ANSWER};
use crate::llm::{LlmError, LlmProvider};

/// A last-resort classifier for labels the vocabulary alone cannot place.
///
/// Returns the best-guess term, or `None` when the classifier does not know.
/// The cascade validates the answer against the vocabulary itself, so
/// implementations may return anything.
#[async_trait]
pub trait FallbackClassifier: Send + Sync + fmt::Debug {
    async fn classify(
        &self,
        name: &str,
        context_terms: &[&str],
    ) -> Result<Option<String>, LlmError>;
}

/// Fallback backed by an LLM provider, bounded by a timeout.
#[derive(Debug)]
pub struct LlmFallback {
    provider: Box<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmFallback {
    pub fn new(provider: Box<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

#[async_trait]
impl FallbackClassifier for LlmFallback {
    async fn classify(
        &self,
        name: &str,
        context_terms: &[&str],
    ) -> Result<Option<String>, LlmError> {
        let prompt = render_normalize_prompt(name, context_terms);

        tracing::debug!(
            name = name,
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            "Asking LLM to classify"
        );

        let response = tokio::time::timeout(self.timeout, self.provider.complete(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        Ok(parse_answer(&response))
    }
}

/// Extract a single lower-cased term from a free-form model reply.
///
/// Models like to wrap answers in quotes, backticks or a trailing period,
/// and sometimes add an explanation on later lines. Only the first
/// non-empty line is used.
pub fn parse_answer(response: &str) -> Option<String> {
    let line = response.lines().map(str::trim).find(|l| !l.is_empty())?;

    let term = line
        .trim_matches(|c: char| {
            matches!(c, '"' | '\'' | '`' | '*' | '.' | '!') || c.is_whitespace()
        })
        .to_lowercase();

    if term.is_empty() || term == UNKNOWN_ANSWER {
        None
    } else {
        Some(term)
    }
}
