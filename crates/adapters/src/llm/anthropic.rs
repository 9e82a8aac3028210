//! Anthropic Messages API adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trend_digest_domain::{GenerationError, GenerationRequest, TextGenerator};

use super::{LlmConfig, SYSTEM_INSTRUCTIONS, request_error, with_retries};

/// Anthropic text generator
pub struct AnthropicGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl AnthropicGenerator {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Self {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string(), config)
    }

    pub fn with_base_url(api_key: SecretString, base_url: String, config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
            config,
        }
    }

    async fn call_api(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        let request = AnthropicRequest {
            model: model.to_string(),
            max_tokens: self.config.max_output_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: Some(SYSTEM_INSTRUCTIONS.to_string()),
            temperature: Some(self.config.temperature),
        };

        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == 429 {
            return Err(GenerationError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .content
            .into_iter()
            .filter(|c| c.r#type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(GenerationError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let model = self.config.model_for(request.tier);
        let prompt = request.prompt.as_str();
        tracing::debug!(model = %model, prompt_chars = prompt.len(), "Calling Anthropic");

        with_retries(self.config.retries, move || self.call_api(prompt, model)).await
    }
}
