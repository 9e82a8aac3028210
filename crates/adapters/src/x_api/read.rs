//! X API read adapter for searching recent posts

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use trend_digest_domain::{FetchError, Post, PostSource, SearchMode};

/// Page size bounds accepted by the recent search endpoint
const MIN_RESULTS: usize = 10;
const MAX_RESULTS: usize = 100;

const TWEET_FIELDS: &str =
    "created_at,public_metrics,entities,referenced_tweets,conversation_id,attachments";

/// X API post source backed by the recent search endpoint
pub struct XPostSource {
    client: Client,
    bearer_token: SecretString,
    base_url: String,
}

impl XPostSource {
    pub fn new(bearer_token: SecretString) -> Self {
        Self::with_base_url(bearer_token, "https://api.twitter.com".to_string())
    }

    pub fn with_base_url(bearer_token: SecretString, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            bearer_token,
            base_url,
        }
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<SearchResponse, FetchError> {
        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let max_results = limit.clamp(MIN_RESULTS, MAX_RESULTS).to_string();
        let sort_order = match mode {
            SearchMode::Latest => "recency",
            SearchMode::Top => "relevancy",
        };

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.bearer_token.expose_secret()),
            )
            .query(&[
                ("query", query),
                ("max_results", max_results.as_str()),
                ("sort_order", sort_order),
                ("tweet.fields", TWEET_FIELDS),
                ("expansions", "author_id,attachments.media_keys"),
                ("user.fields", "username"),
                ("media.fields", "url,preview_image_url"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(FetchError::Auth("Invalid bearer token".to_string()));
        }

        if response.status() == 429 {
            return Err(FetchError::RateLimited(rate_limit_reset(&response)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!(
                "Search failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Api(e.to_string()))
    }
}

/// Time until the rate limit window resets, from `x-rate-limit-reset`
pub(crate) fn rate_limit_reset(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(|ts| {
            let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
            Duration::from_secs(ts.saturating_sub(now))
        })
}

#[derive(Deserialize)]
struct SearchResponse {
    data: Option<Vec<Tweet>>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Deserialize, Default)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Deserialize)]
struct User {
    id: String,
    username: String,
}

#[derive(Deserialize)]
struct Media {
    media_key: String,
    url: Option<String>,
    preview_image_url: Option<String>,
}

#[derive(Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
    conversation_id: Option<String>,
    public_metrics: Option<PublicMetrics>,
    entities: Option<Entities>,
    referenced_tweets: Option<Vec<ReferencedTweet>>,
    attachments: Option<Attachments>,
}

#[derive(Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
}

#[derive(Deserialize)]
struct Entities {
    #[serde(default)]
    hashtags: Vec<Tag>,
    #[serde(default)]
    mentions: Vec<Mention>,
}

#[derive(Deserialize)]
struct Tag {
    tag: String,
}

#[derive(Deserialize)]
struct Mention {
    username: String,
}

#[derive(Deserialize)]
struct ReferencedTweet {
    r#type: String,
}

#[derive(Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

impl SearchResponse {
    fn into_posts(self, fallback_author: &str) -> Vec<Post> {
        let usernames: HashMap<&str, &str> = self
            .includes
            .users
            .iter()
            .map(|u| (u.id.as_str(), u.username.as_str()))
            .collect();
        let media_by_key: HashMap<&str, &str> = self
            .includes
            .media
            .iter()
            .filter_map(|m| {
                m.url
                    .as_deref()
                    .or(m.preview_image_url.as_deref())
                    .map(|url| (m.media_key.as_str(), url))
            })
            .collect();

        self.data
            .unwrap_or_default()
            .into_iter()
            .map(|tweet| {
                let author = tweet
                    .author_id
                    .as_deref()
                    .and_then(|id| usernames.get(id).copied())
                    .unwrap_or(fallback_author)
                    .to_string();

                let is_repost = tweet
                    .referenced_tweets
                    .as_ref()
                    .map(|refs| refs.iter().any(|r| r.r#type == "retweeted"))
                    .unwrap_or(false);

                // Undated posts fall outside any recency window
                let created_at = tweet
                    .created_at
                    .as_ref()
                    .and_then(|s| {
                        OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339)
                            .ok()
                    })
                    .unwrap_or(OffsetDateTime::UNIX_EPOCH);

                let (like_count, repost_count) = tweet
                    .public_metrics
                    .map(|m| (m.like_count, m.retweet_count))
                    .unwrap_or_default();

                let (hashtags, mentions): (Vec<String>, Vec<String>) = tweet
                    .entities
                    .map(|e| {
                        (
                            e.hashtags.into_iter().map(|t| t.tag).collect(),
                            e.mentions.into_iter().map(|m| m.username).collect(),
                        )
                    })
                    .unwrap_or_default();

                let media_urls: Vec<String> = tweet
                    .attachments
                    .map(|a| {
                        a.media_keys
                            .iter()
                            .filter_map(|key| media_by_key.get(key.as_str()))
                            .map(|url| url.to_string())
                            .collect()
                    })
                    .unwrap_or_default();

                Post {
                    url: format!("https://x.com/{}/status/{}", author, tweet.id),
                    id: tweet.id,
                    author,
                    text: tweet.text,
                    created_at,
                    like_count,
                    repost_count,
                    hashtags,
                    mentions,
                    media_urls,
                    is_repost,
                    conversation_id: tweet.conversation_id,
                }
            })
            .collect()
    }
}

#[async_trait]
impl PostSource for XPostSource {
    async fn fetch_recent(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<Vec<Post>, FetchError> {
        tracing::info!(query = %query, limit = limit, mode = ?mode, "Searching recent posts on X");

        let response = self.search(query, limit, mode).await?;
        let fallback_author = query.strip_prefix("from:").unwrap_or_default();
        let mut posts = response.into_posts(fallback_author);
        posts.truncate(limit);

        tracing::info!(query = %query, count = posts.len(), "Fetched posts");

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> XPostSource {
        XPostSource::with_base_url(SecretString::new("test-token".into()), server.uri())
    }

    #[tokio::test]
    async fn test_fetch_recent_maps_posts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .and(header("Authorization", "Bearer test-token"))
            .and(query_param("query", "from:alice"))
            .and(query_param("max_results", "10"))
            .and(query_param("sort_order", "recency"))
            .and(query_param(
                "tweet.fields",
                "created_at,public_metrics,entities,referenced_tweets,conversation_id,attachments",
            ))
            .and(query_param("expansions", "author_id,attachments.media_keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "id": "111",
                        "text": "Agents are great #AI @bob",
                        "author_id": "42",
                        "created_at": "2024-01-15T12:00:00Z",
                        "conversation_id": "111",
                        "public_metrics": {"like_count": 7, "retweet_count": 3, "reply_count": 1},
                        "entities": {
                            "hashtags": [{"start": 18, "end": 21, "tag": "AI"}],
                            "mentions": [{"start": 22, "end": 26, "username": "bob"}]
                        },
                        "attachments": {"media_keys": ["3_1"]}
                    },
                    {
                        "id": "112",
                        "text": "RT @carol: hello",
                        "author_id": "42",
                        "created_at": "2024-01-15T13:00:00Z",
                        "referenced_tweets": [{"type": "retweeted", "id": "99"}]
                    }
                ],
                "includes": {
                    "users": [{"id": "42", "username": "alice", "name": "Alice"}],
                    "media": [{"media_key": "3_1", "type": "photo", "url": "https://pbs.twimg.com/media/a.jpg"}]
                }
            })))
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_recent("from:alice", 5, SearchMode::Latest)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        let first = &posts[0];
        assert_eq!(first.author, "alice");
        assert_eq!(first.url, "https://x.com/alice/status/111");
        assert_eq!(first.like_count, 7);
        assert_eq!(first.repost_count, 3);
        assert_eq!(first.hashtags, vec!["AI"]);
        assert_eq!(first.mentions, vec!["bob"]);
        assert_eq!(first.media_urls, vec!["https://pbs.twimg.com/media/a.jpg"]);
        assert_eq!(first.conversation_id.as_deref(), Some("111"));
        assert!(!first.is_repost);
        assert!(posts[1].is_repost);
        assert_eq!(posts[1].engagement(), 0);
    }

    #[tokio::test]
    async fn test_fetch_recent_top_mode_and_fallback_author() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .and(query_param("sort_order", "relevancy"))
            .and(query_param("max_results", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "1", "text": "no metadata"}]
            })))
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_recent("from:dave", 500, SearchMode::Top)
            .await
            .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "dave");
        assert_eq!(posts[0].created_at, OffsetDateTime::UNIX_EPOCH);
        assert!(posts[0].hashtags.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recent_empty_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"result_count": 0}
            })))
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_recent("from:alice", 10, SearchMode::Latest)
            .await
            .unwrap();

        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recent_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server)
            .fetch_recent("from:alice", 10, SearchMode::Latest)
            .await;

        assert!(matches!(result, Err(FetchError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_fetch_recent_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server)
            .fetch_recent("from:alice", 10, SearchMode::Latest)
            .await;

        assert!(matches!(result, Err(FetchError::Auth(_))));
    }

    #[tokio::test]
    async fn test_fetch_recent_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server)
            .fetch_recent("from:alice", 10, SearchMode::Latest)
            .await;

        match result {
            Err(FetchError::Api(message)) => assert!(message.contains("over capacity")),
            other => panic!("expected Api error, got {:?}", other.map(|p| p.len())),
        }
    }
}
