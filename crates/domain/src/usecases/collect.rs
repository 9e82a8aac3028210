//! Collection use case - fetches a recent window of posts per account

use rand::Rng;
use regex::Regex;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::time::{Duration, sleep};

use crate::{
    model::Post,
    ports::{PostSource, SearchMode},
};

/// Configuration for collection
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Posts requested per account
    pub posts_per_account: usize,
    /// Only posts newer than this are kept
    pub recency_window: time::Duration,
    /// Fixed pause between two accounts
    pub fetch_delay: Duration,
    /// Upper bound of the random extra pause between two accounts
    pub fetch_jitter: Duration,
    /// Search ordering
    pub search_mode: SearchMode,
    /// Regex patterns for posts to ignore
    pub ignore_patterns: Vec<String>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            posts_per_account: 10,
            recency_window: time::Duration::hours(24),
            fetch_delay: Duration::from_millis(2000),
            fetch_jitter: Duration::from_millis(2000),
            search_mode: SearchMode::Latest,
            ignore_patterns: vec![],
        }
    }
}

/// Use case for collecting recent posts from monitored accounts
pub struct CollectUseCase<S> {
    source: S,
    config: CollectConfig,
    ignore_patterns: Vec<Regex>,
}

impl<S: PostSource> CollectUseCase<S> {
    pub fn new(source: S, config: CollectConfig) -> Self {
        let ignore_patterns = compile_ignore_patterns(&config.ignore_patterns);
        Self {
            source,
            config,
            ignore_patterns,
        }
    }

    /// Fetch, filter and concatenate recent posts for every account, in order.
    ///
    /// Accounts whose fetch fails are skipped. Accounts are fetched one at a
    /// time with a jittered pause in between to stay clear of rate limits.
    pub async fn collect_recent_posts(
        &self,
        accounts: &[String],
        now: OffsetDateTime,
    ) -> Vec<Post> {
        let cutoff = now
            .checked_sub(self.config.recency_window)
            .unwrap_or(PrimitiveDateTime::MIN.assume_utc());
        let mut collected = Vec::new();

        for (i, account) in accounts.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }

            let query = format!("from:{}", account);
            let posts = match self
                .source
                .fetch_recent(&query, self.config.posts_per_account, self.config.search_mode)
                .await
            {
                Ok(posts) => posts,
                Err(e) => {
                    tracing::warn!(
                        account = %account,
                        error = %e,
                        "Failed to fetch posts, skipping account"
                    );
                    continue;
                }
            };

            let fetched = posts.len();
            let kept = self.filter_posts(posts, cutoff);

            tracing::info!(
                account = %account,
                fetched = fetched,
                kept = kept.len(),
                "Collected posts"
            );

            collected.extend(kept);
        }

        collected
    }

    /// Drop stale posts, reposts and ignored patterns
    fn filter_posts(&self, posts: Vec<Post>, cutoff: OffsetDateTime) -> Vec<Post> {
        posts
            .into_iter()
            .filter(|p| {
                if p.is_repost {
                    return false;
                }
                if p.created_at < cutoff {
                    return false;
                }
                if self
                    .ignore_patterns
                    .iter()
                    .any(|pattern| pattern.is_match(&p.text))
                {
                    return false;
                }
                true
            })
            .collect()
    }

    async fn pause(&self) {
        let delay = self.jittered_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Pausing between accounts");
        sleep(delay).await;
    }

    fn jittered_delay(&self) -> Duration {
        let jitter_ms = self.config.fetch_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.config.fetch_delay;
        }
        self.config.fetch_delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

fn compile_ignore_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::warn!(pattern = %pattern, error = %error, "Invalid ignore pattern");
                None
            }
        })
        .collect()
}
