//! X (Twitter) API adapters

mod read;
mod write;

pub use read::XPostSource;
pub use write::XPublisher;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use time::OffsetDateTime;
use trend_digest_domain::{
    FetchError, PlatformPost, Post, PostSource, PublishError, PublishRequest, Publisher,
    SearchMode,
};

/// Stub post source for testing, keyed by account handle
#[derive(Default)]
pub struct StubPostSource {
    posts: HashMap<String, Vec<Post>>,
    failing: HashSet<String>,
}

impl StubPostSource {
    /// Create an empty stub
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serve `posts` for `from:<account>` queries
    pub fn with_account(mut self, account: &str, posts: Vec<Post>) -> Self {
        self.posts.insert(account.to_string(), posts);
        self
    }

    /// Canned recent posts for every account, so a cycle can run offline
    pub fn sample(accounts: &[String], now: OffsetDateTime) -> Self {
        const SAMPLES: &[(&str, &[&str], u64)] = &[
            ("Great week for open models #AI #OpenSource", &["AI", "OpenSource"], 42),
            ("Fees are down again, bullish on #DeFi", &["DeFi"], 17),
            ("Shipping the new #AI agent release today", &["AI"], 8),
        ];

        accounts.iter().fold(Self::empty(), |stub, account| {
            let posts = SAMPLES
                .iter()
                .enumerate()
                .map(|(i, (text, hashtags, likes))| {
                    let id = format!("{}_{}", account, i + 1);
                    Post {
                        url: format!("https://x.com/{}/status/{}", account, id),
                        id: id.clone(),
                        author: account.clone(),
                        text: text.to_string(),
                        created_at: now - time::Duration::minutes(30 * (i as i64 + 1)),
                        like_count: *likes,
                        repost_count: likes / 4,
                        hashtags: hashtags.iter().map(|t| t.to_string()).collect(),
                        mentions: vec![],
                        media_urls: vec![],
                        is_repost: false,
                        conversation_id: Some(id),
                    }
                })
                .collect();
            stub.with_account(account, posts)
        })
    }

    /// Fail every fetch for `account`
    pub fn failing_for(mut self, account: &str) -> Self {
        self.failing.insert(account.to_string());
        self
    }
}

#[async_trait]
impl PostSource for StubPostSource {
    async fn fetch_recent(
        &self,
        query: &str,
        limit: usize,
        _mode: SearchMode,
    ) -> Result<Vec<Post>, FetchError> {
        let account = query.strip_prefix("from:").unwrap_or(query);
        if self.failing.contains(account) {
            return Err(FetchError::Api(format!("Stub failure for {}", account)));
        }
        Ok(self
            .posts
            .get(account)
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Stub X publisher for testing
pub struct StubXPublisher {
    handle: String,
    allow_long_form: bool,
    published: Mutex<Vec<PublishRequest>>,
}

impl StubXPublisher {
    pub fn new(handle: &str) -> Self {
        Self {
            handle: handle.to_string(),
            allow_long_form: true,
            published: Mutex::new(vec![]),
        }
    }

    /// Reject long-form posts as an account without the entitlement would
    pub fn without_long_form(mut self) -> Self {
        self.allow_long_form = false;
        self
    }

    /// Get all posts that were accepted
    pub fn get_published(&self) -> Vec<PublishRequest> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    fn accept(&self, request: &PublishRequest) -> PlatformPost {
        let mut published = self
            .published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        published.push(request.clone());
        let id = format!("stub_{}", published.len());
        PlatformPost {
            id: id.clone(),
            text: request.text.clone(),
            author: self.handle.clone(),
            conversation_id: Some(id),
            created_at: None,
        }
    }
}

#[async_trait]
impl Publisher for StubXPublisher {
    async fn publish_standard(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        Ok(self.accept(request))
    }

    async fn publish_long_form(
        &self,
        request: &PublishRequest,
    ) -> Result<PlatformPost, PublishError> {
        if !self.allow_long_form {
            return Err(PublishError::NotAuthorized(
                "Stub account cannot post long-form".to_string(),
            ));
        }
        Ok(self.accept(request))
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn handle(&self) -> &str {
        &self.handle
    }
}
