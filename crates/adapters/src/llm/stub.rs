//! Stub text generator for testing and offline mode

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use trend_digest_domain::{GenerationError, GenerationRequest, ModelTier, TextGenerator};

const CANNED_TRENDS: &str = r#"{
  "themes": [{"name": "Stub theme", "count": 1, "sentiment": "neutral"}],
  "trends": ["Offline mode is active"],
  "top_mentions": [],
  "notable_posts": []
}"#;

const CANNED_REPORT: &str =
    "📊 Trend digest (offline stub). No live model was consulted for this report.";

/// Stub generator that replays scripted replies, then falls back to canned output
#[derive(Default)]
pub struct StubGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    /// Stub answering with canned trend data (small tier) and a canned report
    pub fn canned() -> Self {
        Self::default()
    }

    /// Stub replaying `replies` in order before falling back to canned output
    pub fn with_replies(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(vec![]),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let scripted = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        if let Some(reply) = scripted {
            return reply;
        }

        Ok(match request.tier {
            ModelTier::Small => CANNED_TRENDS.to_string(),
            ModelTier::Medium | ModelTier::Large => CANNED_REPORT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tier: ModelTier) -> GenerationRequest {
        GenerationRequest {
            prompt: format!("prompt for {:?}", tier),
            tier,
        }
    }

    #[tokio::test]
    async fn test_canned_replies_by_tier() {
        let generator = StubGenerator::canned();

        let trends = generator.generate(request(ModelTier::Small)).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&trends).unwrap();
        assert!(parsed["themes"].is_array());

        let report = generator.generate(request(ModelTier::Large)).await.unwrap();
        assert!(report.starts_with("📊"));
        assert_eq!(generator.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_replies_come_first() {
        let generator = StubGenerator::with_replies(vec![
            Ok("first".to_string()),
            Err(GenerationError::Timeout),
        ]);

        assert_eq!(
            generator.generate(request(ModelTier::Large)).await.unwrap(),
            "first"
        );
        assert!(matches!(
            generator.generate(request(ModelTier::Large)).await,
            Err(GenerationError::Timeout)
        ));
        assert_eq!(
            generator.generate(request(ModelTier::Large)).await.unwrap(),
            CANNED_REPORT
        );
    }
}
