//! Ollama generate-endpoint provider.

use super::{LlmError, LlmProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling temperature for classification prompts. Kept low so the model
/// picks the most likely term instead of paraphrasing.
const TEMPERATURE: f32 = 0.1;

/// Ollama `/api/generate` provider.
#[derive(Debug)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider posting to `endpoint` (the full generate URL).
    pub fn new(endpoint: String, model: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            endpoint,
            model,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Non-streaming generate response. `response` may be missing or not a
/// string when the server misbehaves, so it is read loosely.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if status != 200 {
            let message = serde_json::from_str::<OllamaErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::ApiError { status, message });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::ParseError(e.to_string()))?;

        match parsed.response {
            serde_json::Value::String(text) => Ok(text),
            other => Err(LlmError::ParseError(format!(
                "Expected string response, got: {}",
                other
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
