//! OpenAI-compatible chat completions adapter for generic providers

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trend_digest_domain::{GenerationError, GenerationRequest, TextGenerator};

use super::{LlmConfig, SYSTEM_INSTRUCTIONS, request_error, with_retries};

/// Text generator for third-party providers speaking the chat completions protocol
pub struct OpenAiCompatGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiCompatGenerator {
    pub fn new(api_key: SecretString, base_url: String, config: LlmConfig) -> Self {
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
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTIONS.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_output_tokens),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

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

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(GenerationError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let model = self.config.model_for(request.tier);
        let prompt = request.prompt.as_str();
        tracing::debug!(model = %model, base_url = %self.base_url, "Calling OpenAI-compatible provider");

        with_retries(self.config.retries, move || self.call_api(prompt, model)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trend_digest_domain::ModelTier;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> OpenAiCompatGenerator {
        OpenAiCompatGenerator::new(
            SecretString::new("test-key".into()),
            format!("{}/v1/", server.uri()),
            LlmConfig {
                medium_model: "llama-3".to_string(),
                retries: 0,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "llama-3"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Digest text"}}]
            })))
            .mount(&mock_server)
            .await;

        let text = generator(&mock_server)
            .generate(GenerationRequest {
                prompt: "Draft".to_string(),
                tier: ModelTier::Medium,
            })
            .await
            .unwrap();

        assert_eq!(text, "Digest text");
    }

    #[tokio::test]
    async fn test_generate_null_content_is_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&mock_server)
            .await;

        let result = generator(&mock_server)
            .generate(GenerationRequest {
                prompt: "Draft".to_string(),
                tier: ModelTier::Medium,
            })
            .await;

        assert!(matches!(result, Err(GenerationError::InvalidFormat(_))));
    }
}
