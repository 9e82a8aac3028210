//! LLM provider adapters

pub mod anthropic;
pub mod openai;
pub mod openai_compat;
pub mod stub;

pub use anthropic::AnthropicGenerator;
pub use openai::OpenAiGenerator;
pub use openai_compat::OpenAiCompatGenerator;
pub use stub::StubGenerator;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use trend_digest_domain::{GenerationError, ModelTier};

/// System instruction shared by every provider
pub(crate) const SYSTEM_INSTRUCTIONS: &str =
    "You are a social media trend analyst. Follow the output format requested in the prompt exactly.";

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model used for `ModelTier::Small`
    pub small_model: String,
    /// Model used for `ModelTier::Medium`
    pub medium_model: String,
    /// Model used for `ModelTier::Large`
    pub large_model: String,
    /// Temperature (0.0-1.0)
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            small_model: "gpt-4o-mini".to_string(),
            medium_model: "gpt-4o-mini".to_string(),
            large_model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_output_tokens: 1500,
            timeout_secs: 60,
            retries: 2,
        }
    }
}

impl LlmConfig {
    /// Model name for a tier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Small => &self.small_model,
            ModelTier::Medium => &self.medium_model,
            ModelTier::Large => &self.large_model,
        }
    }
}

/// Run `call` up to `retries + 1` times with exponential backoff.
///
/// Rate limiting is returned immediately; retrying would only dig deeper.
pub(crate) async fn with_retries<F, Fut>(retries: u32, mut call: F) -> Result<String, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, GenerationError>>,
{
    let mut last_error = None;
    for attempt in 0..=retries {
        if attempt > 0 {
            tracing::warn!(attempt = attempt, "Retrying generation");
            tokio::time::sleep(Duration::from_millis(500 * 2_u64.pow(attempt))).await;
        }

        match call().await {
            Ok(text) => return Ok(text),
            Err(GenerationError::RateLimited) => return Err(GenerationError::RateLimited),
            Err(e) => {
                tracing::warn!(attempt = attempt, error = %e, "Generation attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| GenerationError::Api("Unknown error".to_string())))
}

/// Map a transport error, keeping timeouts distinct
pub(crate) fn request_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Api(e.to_string())
    }
}
