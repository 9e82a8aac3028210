//! Lightweight analytics over a collection window
//!
//! Everything here is pure: no I/O, no clock, no randomness.

use std::collections::HashMap;

use crate::model::{AnalysisResult, EngagedPost, HashtagCount, Post, Sentiment, SentimentTally};

/// Number of hashtags reported when no explicit count is configured
pub const DEFAULT_TOP_HASHTAGS: usize = 3;

const POSITIVE_KEYWORDS: &[&str] = &["great", "awesome", "amazing", "excellent", "love", "bullish"];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad",
    "terrible",
    "disappointing",
    "awful",
    "hate",
    "bearish",
];

/// Most frequent hashtags, highest count first.
///
/// Ties keep the order in which the hashtags were first encountered.
pub fn top_hashtags(posts: &[Post], n: usize) -> Vec<HashtagCount> {
    let mut counts: Vec<HashtagCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tag in posts.iter().flat_map(|p| p.hashtags.iter()) {
        match index.get(tag.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(tag.as_str(), counts.len());
                counts.push(HashtagCount {
                    tag: tag.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

/// Classify text by keyword; positive wins over negative
pub fn classify_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();

    if POSITIVE_KEYWORDS.iter().any(|word| lower.contains(word)) {
        Sentiment::Positive
    } else if NEGATIVE_KEYWORDS.iter().any(|word| lower.contains(word)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Tally sentiment over all posts
pub fn analyze_sentiment(posts: &[Post]) -> SentimentTally {
    posts.iter().fold(SentimentTally::default(), |mut tally, post| {
        tally.record(classify_sentiment(&post.text));
        tally
    })
}

/// The post with the highest likes + reposts.
///
/// Returns the sentinel for an empty slice. The first post always displaces
/// the sentinel, and later posts only displace the current pick when strictly
/// more engaged, so ties go to the earliest post.
pub fn most_engaged(posts: &[Post]) -> EngagedPost {
    posts.iter().fold(EngagedPost::sentinel(), |best, post| {
        if best.is_sentinel() || post.engagement() > best.engagement() {
            EngagedPost::from(post)
        } else {
            best
        }
    })
}

/// Compute the full analysis for a window
pub fn analyze(posts: &[Post], top_n: usize) -> AnalysisResult {
    AnalysisResult {
        total_posts: posts.len(),
        top_hashtags: top_hashtags(posts, top_n),
        sentiment: analyze_sentiment(posts),
        most_engaged: most_engaged(posts),
    }
}
