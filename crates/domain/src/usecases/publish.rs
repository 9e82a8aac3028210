//! Publication use case - posts the digest and records its side effects

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    model::{
        LastPublished, MemoryContent, MemoryRecord, PlatformPost, Post, PublishRequest,
        PublishResult, unix_millis,
    },
    policy::truncate_to_sentence,
    ports::{PublishError, Publisher, StateStore},
};

/// Source tag stored on digest memories
pub const TREND_REPORT_SOURCE: &str = "trend_report";

/// Configuration for publication
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Standard post ceiling; longer text goes long-form
    pub standard_max_chars: usize,
    /// Agent name, hashed into the agent ID
    pub agent_name: String,
    /// Source tag for memory records
    pub source: String,
    /// Length of the placeholder embedding
    pub embedding_dims: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            standard_max_chars: 280,
            agent_name: "Trend Digest".to_string(),
            source: TREND_REPORT_SOURCE.to_string(),
            embedding_dims: 1536,
        }
    }
}

/// Use case for publishing a digest
pub struct PublishUseCase<P, St> {
    publisher: P,
    store: St,
    config: PublishConfig,
}

impl<P: Publisher, St: StateStore> PublishUseCase<P, St> {
    pub fn new(publisher: P, store: St, config: PublishConfig) -> Self {
        Self {
            publisher,
            store,
            config,
        }
    }

    /// Publish `text` and persist the side effects.
    ///
    /// Once the platform accepts the post the call succeeds, whatever happens
    /// to the side effects afterwards.
    pub async fn publish(
        &self,
        text: &str,
        now: OffsetDateTime,
    ) -> Result<PublishResult, PublishError> {
        let created = self.send(text).await?;
        if created.id.is_empty() {
            return Err(PublishError::MalformedResponse(
                "platform returned an empty post ID".to_string(),
            ));
        }

        let post = self.canonical_post(created, now);
        let result = PublishResult {
            id: post.id.clone(),
            url: post.url.clone(),
            created_at: post.created_at,
        };

        tracing::info!(post_id = %result.id, url = %result.url, "Published digest");

        self.record_side_effects(text, &post, now).await;

        Ok(result)
    }

    /// Pick the posting mode, with one truncate-and-retry fallback
    async fn send(&self, text: &str) -> Result<PlatformPost, PublishError> {
        let max = self.config.standard_max_chars;
        let len = text.chars().count();

        if len <= max {
            return self
                .publisher
                .publish_standard(&PublishRequest::text(text))
                .await;
        }

        tracing::info!(len = len, max = max, "Digest exceeds standard ceiling, posting long-form");

        match self
            .publisher
            .publish_long_form(&PublishRequest::text(text))
            .await
        {
            Err(PublishError::NotAuthorized(reason)) => {
                let truncated = truncate_to_sentence(text, max);
                tracing::warn!(
                    reason = %reason,
                    truncated_len = truncated.chars().count(),
                    "Long-form post rejected, retrying as truncated standard post"
                );
                self.publisher
                    .publish_standard(&PublishRequest::text(truncated))
                    .await
            }
            other => other,
        }
    }

    fn canonical_post(&self, created: PlatformPost, now: OffsetDateTime) -> Post {
        let author = if created.author.is_empty() {
            self.publisher.handle().to_string()
        } else {
            created.author
        };
        Post {
            url: status_url(&author, &created.id),
            conversation_id: Some(created.conversation_id.unwrap_or_else(|| created.id.clone())),
            created_at: created.created_at.unwrap_or(now),
            id: created.id,
            author,
            text: created.text,
            like_count: 0,
            repost_count: 0,
            hashtags: vec![],
            mentions: vec![],
            media_urls: vec![],
            is_repost: false,
        }
    }

    /// Cache and memory writes; each failure is logged and skipped
    async fn record_side_effects(&self, original_text: &str, post: &Post, now: OffsetDateTime) {
        let handle = self.publisher.handle();
        let agent_id = agent_uuid(&self.config.agent_name);
        let conversation_id = post.conversation_id.as_deref().unwrap_or(&post.id);
        let room_id = room_uuid(conversation_id, agent_id);

        let last = LastPublished {
            post_id: post.id.clone(),
            timestamp_ms: unix_millis(now),
        };
        match serde_json::to_value(&last) {
            Ok(value) => {
                if let Err(e) = self.store.set_cache(&last_post_key(handle), &value).await {
                    tracing::error!(error = %e, "Failed to cache last published post");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode last published post"),
        }

        match serde_json::to_value(post) {
            Ok(value) => {
                if let Err(e) = self.store.set_cache(&post_key(&post.id), &value).await {
                    tracing::error!(error = %e, post_id = %post.id, "Failed to cache post");
                }
            }
            Err(e) => tracing::error!(error = %e, post_id = %post.id, "Failed to encode post"),
        }

        if let Err(e) = self.store.ensure_room(room_id).await {
            tracing::error!(error = %e, room_id = %room_id, "Failed to ensure room");
        }
        if let Err(e) = self.store.ensure_participant(room_id, agent_id).await {
            tracing::error!(error = %e, room_id = %room_id, "Failed to ensure participant");
        }

        let memory = MemoryRecord {
            id: memory_uuid(&post.id, agent_id),
            agent_id,
            room_id,
            content: MemoryContent {
                text: original_text.to_string(),
                url: post.url.clone(),
                source: self.config.source.clone(),
                in_reply_to: None,
            },
            embedding: vec![0.0; self.config.embedding_dims],
            created_at_ms: unix_millis(post.created_at),
        };
        if let Err(e) = self.store.create_memory(&memory).await {
            tracing::error!(error = %e, memory_id = %memory.id, "Failed to create memory");
        }
    }
}

/// Deterministic agent ID derived from its name
pub fn agent_uuid(agent_name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, agent_name.as_bytes())
}

/// Deterministic memory ID for a published post
pub fn memory_uuid(post_id: &str, agent_id: Uuid) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}-{}", post_id, agent_id).as_bytes(),
    )
}

/// Deterministic room ID for a conversation
pub fn room_uuid(conversation_id: &str, agent_id: Uuid) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}-{}", conversation_id, agent_id).as_bytes(),
    )
}

/// Cache key of the last published post of an account
pub fn last_post_key(handle: &str) -> String {
    format!("x/{}/last_post", handle)
}

/// Cache key of a published post record
pub fn post_key(post_id: &str) -> String {
    format!("x/posts/{}", post_id)
}

fn status_url(handle: &str, post_id: &str) -> String {
    format!("https://x.com/{}/status/{}", handle, post_id)
}
