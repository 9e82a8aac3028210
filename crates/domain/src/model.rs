//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A post fetched from a monitored account (e.g., X/Twitter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Platform-specific post ID
    pub id: String,
    /// Author username/handle
    pub author: String,
    /// Post text content
    pub text: String,
    /// Permanent URL of the post
    pub url: String,
    /// When the post was created
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Like count at fetch time
    #[serde(default)]
    pub like_count: u64,
    /// Repost count at fetch time
    #[serde(default)]
    pub repost_count: u64,
    /// Hashtags without the leading '#'
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Mentioned handles without the leading '@'
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Attached media URLs
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Whether this is a repost/retweet
    #[serde(default)]
    pub is_repost: bool,
    /// Conversation/thread ID
    pub conversation_id: Option<String>,
}

impl Post {
    /// Likes plus reposts
    pub fn engagement(&self) -> u64 {
        self.like_count.saturating_add(self.repost_count)
    }
}

/// How often a hashtag occurred in a collection window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagCount {
    pub tag: String,
    pub count: usize,
}

/// Sentiment class assigned to a single post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Per-class sentiment counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentTally {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

/// Projection of the most-engaged post of a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagedPost {
    pub id: String,
    pub author: String,
    pub text: String,
    pub like_count: u64,
    pub repost_count: u64,
}

impl EngagedPost {
    /// Zero-engagement placeholder used when no post qualifies
    pub fn sentinel() -> Self {
        Self {
            id: String::new(),
            author: String::new(),
            text: String::new(),
            like_count: 0,
            repost_count: 0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_empty()
    }

    pub fn engagement(&self) -> u64 {
        self.like_count.saturating_add(self.repost_count)
    }
}

impl From<&Post> for EngagedPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            author: post.author.clone(),
            text: post.text.clone(),
            like_count: post.like_count,
            repost_count: post.repost_count,
        }
    }
}

/// Summary statistics for one collection window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_posts: usize,
    pub top_hashtags: Vec<HashtagCount>,
    pub sentiment: SentimentTally,
    pub most_engaged: EngagedPost,
}

impl AnalysisResult {
    /// Encode for inclusion in a generation prompt
    pub fn to_prompt_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A theme identified by trend extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub sentiment: Option<String>,
}

/// Structured trend data returned by the first generation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub trends: Vec<String>,
    #[serde(default)]
    pub top_mentions: Vec<String>,
    #[serde(default)]
    pub notable_posts: Vec<String>,
}

/// Human-readable digest ready for publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReport {
    pub text: String,
}

impl DraftReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of `#tag` tokens in the text
    pub fn hashtag_count(&self) -> usize {
        self.text
            .split_whitespace()
            .filter(|word| {
                word.strip_prefix('#')
                    .is_some_and(|rest| rest.chars().next().is_some_and(char::is_alphanumeric))
            })
            .count()
    }
}

/// Content of a create-post request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishRequest {
    pub text: String,
    /// Post ID to reply to, if any
    pub reply_to: Option<String>,
    /// Previously uploaded media IDs
    pub media_ids: Vec<String>,
}

impl PublishRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Post as reported back by the platform after creation
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformPost {
    pub id: String,
    pub text: String,
    pub author: String,
    pub conversation_id: Option<String>,
    pub created_at: Option<OffsetDateTime>,
}

/// Result of a successful digest publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Platform-assigned post ID
    pub id: String,
    /// Permanent URL
    pub url: String,
    /// Creation time
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Value of the "last published post" cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPublished {
    pub post_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

/// Content of a memory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryContent {
    pub text: String,
    pub url: String,
    pub source: String,
    #[serde(default)]
    pub in_reply_to: Option<Uuid>,
}

/// Conversational memory entry linking a published digest to the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub room_id: Uuid,
    pub content: MemoryContent,
    pub embedding: Vec<f32>,
    /// Milliseconds since the Unix epoch
    pub created_at_ms: i64,
}

/// Pipeline stages that can abandon a cycle
///
/// Collection skips failing accounts and analytics is infallible, so neither
/// appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Summarization,
    Publication,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Summarization => "summarization",
            Stage::Publication => "publication",
        };
        f.write_str(name)
    }
}

/// Why a cycle ended without doing any work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle on the same pipeline was in flight
    AlreadyRunning,
    /// No accounts are configured
    NoAccounts,
    /// Collection produced no posts
    NoPosts,
}

/// Outcome of a single digest cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was attempted
    Skipped { reason: SkipReason },
    /// Dry run: the report was drafted but not published
    Drafted { report: DraftReport },
    /// The digest was published
    Published { result: PublishResult },
    /// A stage failed and the cycle was abandoned
    Failed { stage: Stage, error: String },
}

/// Milliseconds since the Unix epoch, the unit used for every persisted timestamp
pub fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_unix_millis() {
        assert_eq!(unix_millis(datetime!(1970-01-01 0:00:01.250 UTC)), 1250);
        assert_eq!(
            unix_millis(datetime!(2024-01-15 12:00 UTC)),
            1_705_320_000_000
        );
    }

    #[test]
    fn test_hashtag_count_ignores_bare_hash() {
        let report = DraftReport::new("Trends: #AI and #DeFi # lonely #1st");
        assert_eq!(report.hashtag_count(), 3);
    }

    #[test]
    fn test_sentinel() {
        let sentinel = EngagedPost::sentinel();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.engagement(), 0);
    }
}
