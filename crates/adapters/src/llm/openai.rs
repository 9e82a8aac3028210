//! OpenAI Responses API adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trend_digest_domain::{GenerationError, GenerationRequest, TextGenerator};

use super::{LlmConfig, SYSTEM_INSTRUCTIONS, request_error, with_retries};

/// OpenAI text generator using the Responses API
pub struct OpenAiGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiGenerator {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1".to_string(), config)
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
        let request = OpenAiRequest {
            model: model.to_string(),
            input: prompt.to_string(),
            instructions: Some(SYSTEM_INSTRUCTIONS.to_string()),
            temperature: Some(self.config.temperature),
            max_output_tokens: Some(self.config.max_output_tokens),
        };

        let url = format!("{}/responses", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
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

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .output
            .into_iter()
            .filter(|item| item.r#type == "message")
            .flat_map(|item| item.content)
            .filter(|c| c.r#type == "output_text")
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
struct OpenAiRequest {
    model: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    r#type: String,
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ContentItem {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let model = self.config.model_for(request.tier);
        let prompt = request.prompt.as_str();
        tracing::debug!(model = %model, prompt_chars = prompt.len(), "Calling OpenAI");

        with_retries(self.config.retries, move || self.call_api(prompt, model)).await
    }
}
