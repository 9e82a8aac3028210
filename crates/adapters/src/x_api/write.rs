//! X API write adapter for publishing posts

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trend_digest_domain::{PlatformPost, PublishError, PublishRequest, Publisher};

/// Whether the request is subject to the standard length ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostKind {
    Standard,
    LongForm,
}

/// X API publisher for creating posts
pub struct XPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
    handle: String,
    max_chars: usize,
    enabled: bool,
}

impl XPublisher {
    pub fn new(user_token: SecretString, handle: String, max_chars: usize) -> Self {
        Self::with_base_url(
            user_token,
            "https://api.twitter.com".to_string(),
            handle,
            max_chars,
            true,
        )
    }

    pub fn with_base_url(
        user_token: SecretString,
        base_url: String,
        handle: String,
        max_chars: usize,
        enabled: bool,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user_token,
            base_url,
            handle,
            max_chars,
            enabled,
        }
    }

    /// Create a disabled publisher (for dry runs)
    pub fn disabled(handle: String) -> Self {
        Self {
            client: Client::new(),
            user_token: SecretString::new("".into()),
            base_url: String::new(),
            handle,
            max_chars: 280,
            enabled: false,
        }
    }

    async fn create_post(
        &self,
        request: &PublishRequest,
        kind: PostKind,
    ) -> Result<PlatformPost, PublishError> {
        if !self.enabled {
            return Err(PublishError::Api("Publisher is disabled".to_string()));
        }

        let len = request.text.chars().count();
        if kind == PostKind::Standard && len > self.max_chars {
            return Err(PublishError::ContentTooLong {
                len,
                max: self.max_chars,
            });
        }

        let body = CreateTweetRequest {
            text: request.text.clone(),
            reply: request.reply_to.clone().map(|id| ReplySettings {
                in_reply_to_tweet_id: id,
            }),
            media: (!request.media_ids.is_empty()).then(|| MediaSettings {
                media_ids: request.media_ids.clone(),
            }),
        };

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.user_token.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PublishError::RateLimited);
        }

        if status == StatusCode::UNAUTHORIZED
            || (kind == PostKind::LongForm && status == StatusCode::FORBIDDEN)
        {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::NotAuthorized(format!("{}: {}", status, body)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "Failed to create post ({}): {}",
                status, body
            )));
        }

        let created: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;

        let data = created.data.ok_or_else(|| {
            PublishError::MalformedResponse("response has no data field".to_string())
        })?;

        tracing::debug!(post_id = %data.id, kind = ?kind, "Created post on X");

        Ok(PlatformPost {
            // The create endpoint starts a new conversation keyed by the post itself
            conversation_id: Some(data.id.clone()),
            id: data.id,
            text: data.text.unwrap_or_else(|| request.text.clone()),
            author: self.handle.clone(),
            created_at: None,
        })
    }
}

#[derive(Serialize)]
struct CreateTweetRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaSettings>,
}

#[derive(Serialize)]
struct ReplySettings {
    in_reply_to_tweet_id: String,
}

#[derive(Serialize)]
struct MediaSettings {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: Option<TweetData>,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
    text: Option<String>,
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish_standard(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        self.create_post(request, PostKind::Standard).await
    }

    async fn publish_long_form(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        self.create_post(request, PostKind::LongForm).await
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn handle(&self) -> &str {
        &self.handle
    }
}
