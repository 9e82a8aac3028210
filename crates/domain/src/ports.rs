//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{MemoryRecord, PlatformPost, Post, PublishRequest};

/// Error type for post source operations
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<std::time::Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Ordering of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Most recent first
    #[default]
    Latest,
    /// Most relevant first
    Top,
}

/// Port for fetching posts from the monitored platform
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch up to `limit` posts matching `query`
    async fn fetch_recent(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<Vec<Post>, FetchError>;
}

/// Error type for text generation
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Model size class requested from the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Small,
    #[default]
    Medium,
    Large,
}

/// A single generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully composed prompt
    pub prompt: String,
    pub tier: ModelTier,
}

/// Port for LLM text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limited")]
    RateLimited,
    /// The account is not allowed to use this publishing mode
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
}

/// Port for creating posts on the platform
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a post within the standard length ceiling
    async fn publish_standard(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError>;

    /// Create a long-form post
    async fn publish_long_form(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError>;

    /// Check if this publisher is enabled
    fn is_enabled(&self) -> bool;

    /// Handle of the publishing account
    fn handle(&self) -> &str;
}

/// Error type for state store operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the key-value cache and the conversational memory store
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Overwrite a cache entry
    async fn set_cache(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError>;

    /// Read a cache entry
    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// Create the room if it does not exist
    async fn ensure_room(&self, room_id: Uuid) -> Result<(), StateError>;

    /// Add the agent to the room if it is not already a participant
    async fn ensure_participant(&self, room_id: Uuid, agent_id: Uuid) -> Result<(), StateError>;

    /// Append a memory record
    async fn create_memory(&self, record: &MemoryRecord) -> Result<(), StateError>;

    /// Look up a memory record by ID
    async fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, StateError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

// Borrowed and shared ports, so use cases can be built over `Arc`-held adapters

#[async_trait]
impl<T: PostSource + ?Sized> PostSource for &T {
    async fn fetch_recent(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<Vec<Post>, FetchError> {
        (**self).fetch_recent(query, limit, mode).await
    }
}

#[async_trait]
impl<T: PostSource + ?Sized> PostSource for std::sync::Arc<T> {
    async fn fetch_recent(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<Vec<Post>, FetchError> {
        (**self).fetch_recent(query, limit, mode).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for &T {
    async fn publish_standard(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        (**self).publish_standard(request).await
    }

    async fn publish_long_form(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        (**self).publish_long_form(request).await
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn handle(&self) -> &str {
        (**self).handle()
    }
}

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for &T {
    async fn set_cache(&self, key: &str, value: &serde_json::Value) -> Result<(), StateError> {
        (**self).set_cache(key, value).await
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        (**self).get_cache(key).await
    }

    async fn ensure_room(&self, room_id: Uuid) -> Result<(), StateError> {
        (**self).ensure_room(room_id).await
    }

    async fn ensure_participant(&self, room_id: Uuid, agent_id: Uuid) -> Result<(), StateError> {
        (**self).ensure_participant(room_id, agent_id).await
    }

    async fn create_memory(&self, record: &MemoryRecord) -> Result<(), StateError> {
        (**self).create_memory(record).await
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, StateError> {
        (**self).get_memory(id).await
    }
}
