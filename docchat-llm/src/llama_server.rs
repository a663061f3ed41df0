//! Client for a llama.cpp-style local completion server.

use crate::error::{GenerateError, Result};
use crate::generator::AnswerGenerator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`LlamaServerGenerator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlamaServerConfig {
    /// Base URL of the completion server (llama.cpp `llama-server`)
    pub base_url: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Stop sequences that end generation
    pub stop: Vec<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl LlamaServerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the sampling temperature (builder style)
    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            temperature,
            ..self
        }
    }
}

impl Default for LlamaServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            temperature: 0.7,
            stop: vec!["</s>".to_string()],
            timeout_secs: 120,
        }
    }
}

/// Request body for the llama.cpp `/completion` endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: usize,
    temperature: f32,
    stop: &'a [String],
}

/// The subset of the `/completion` response we consume
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// [`AnswerGenerator`] backed by a local llama.cpp completion server.
///
/// The inference engine stays an external collaborator: this client only
/// posts the assembled prompt and returns the generated text verbatim, with
/// no post-processing.
#[derive(Debug, Clone)]
pub struct LlamaServerGenerator {
    config: LlamaServerConfig,
    client: reqwest::Client,
}

impl LlamaServerGenerator {
    pub fn new(config: LlamaServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnswerGenerator for LlamaServerGenerator {
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let request = CompletionRequest {
            prompt,
            n_predict: max_tokens,
            temperature: self.config.temperature,
            stop: &self.config.stop,
        };

        tracing::debug!(
            "Requesting completion of up to {} tokens from {}",
            max_tokens,
            self.completion_url()
        );

        let response = self
            .client
            .post(self.completion_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::invalid_response(e.to_string()))?;

        Ok(completion.content)
    }

    fn generator_name(&self) -> &str {
        "llama-server"
    }
}
