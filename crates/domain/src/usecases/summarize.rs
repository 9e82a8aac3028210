//! Summarization use case - trend extraction followed by report drafting

use crate::{
    model::{AnalysisResult, DraftReport, EngagedPost, TrendSummary},
    ports::{GenerationError, GenerationRequest, ModelTier, TextGenerator},
    templates::{
        DRAFT_REPORT_TEMPLATE, NO_NOTABLE_POSTS, TREND_EXTRACTION_TEMPLATE, compose_prompt,
        extract_json,
    },
};

/// Configuration for the summarize use case
#[derive(Debug, Clone)]
pub struct SummarizeConfig {
    /// Name the report is written as
    pub agent_name: String,
    /// Short self-description of the agent
    pub bio: String,
    /// Writing style guidance
    pub style: String,
    /// Model tier for trend extraction
    pub extraction_tier: ModelTier,
    /// Model tier for drafting
    pub draft_tier: ModelTier,
    /// Character ceiling communicated to the drafter
    pub max_chars: usize,
    /// Hashtag ceiling communicated to the drafter
    pub max_hashtags: usize,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            agent_name: "Trend Digest".to_string(),
            bio: "You track what monitored accounts are talking about.".to_string(),
            style: "Concise, neutral and data-driven.".to_string(),
            extraction_tier: ModelTier::Small,
            draft_tier: ModelTier::Large,
            max_chars: 4000,
            max_hashtags: 3,
        }
    }
}

/// Errors from summarization
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("Failed to encode analysis: {0}")]
    Encoding(String),
    #[error("Invalid trend data: {0}")]
    InvalidTrendData(String),
    #[error("Generated report is empty")]
    EmptyDraft,
}

/// Use case for turning an analysis into a publishable report
pub struct SummarizeUseCase<G> {
    generator: G,
    config: SummarizeConfig,
}

impl<G: TextGenerator> SummarizeUseCase<G> {
    pub fn new(generator: G, config: SummarizeConfig) -> Self {
        Self { generator, config }
    }

    /// Run both generation steps in sequence
    pub async fn summarize(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<DraftReport, SummarizeError> {
        let trends = self.extract_trends(analysis).await?;
        self.draft_report(&trends).await
    }

    /// Ask the generator for structured trend data
    pub async fn extract_trends(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<TrendSummary, SummarizeError> {
        let encoded = analysis
            .to_prompt_json()
            .map_err(|e| SummarizeError::Encoding(e.to_string()))?;
        let post_count = analysis.total_posts.to_string();
        let most_engaged = describe_most_engaged(&analysis.most_engaged);

        let prompt = compose_prompt(
            TREND_EXTRACTION_TEMPLATE,
            &[
                ("analysis", encoded.as_str()),
                ("post_count", post_count.as_str()),
                ("most_engaged", most_engaged.as_str()),
            ],
        );

        tracing::info!(
            post_count = analysis.total_posts,
            tier = ?self.config.extraction_tier,
            "Extracting trends"
        );

        let reply = self
            .generator
            .generate(GenerationRequest {
                prompt,
                tier: self.config.extraction_tier,
            })
            .await?;

        let trends = parse_trend_summary(&reply).map_err(SummarizeError::InvalidTrendData)?;

        tracing::debug!(
            themes = trends.themes.len(),
            trends = trends.trends.len(),
            "Extracted trends"
        );

        Ok(trends)
    }

    /// Ask the generator to draft the report text
    pub async fn draft_report(
        &self,
        trends: &TrendSummary,
    ) -> Result<DraftReport, SummarizeError> {
        let trend_data = serde_json::to_string_pretty(trends)
            .map_err(|e| SummarizeError::Encoding(e.to_string()))?;
        let max_chars = self.config.max_chars.to_string();
        let max_hashtags = self.config.max_hashtags.to_string();

        let prompt = compose_prompt(
            DRAFT_REPORT_TEMPLATE,
            &[
                ("trend_data", trend_data.as_str()),
                ("agent_name", self.config.agent_name.as_str()),
                ("bio", self.config.bio.as_str()),
                ("style", self.config.style.as_str()),
                ("max_chars", max_chars.as_str()),
                ("max_hashtags", max_hashtags.as_str()),
            ],
        );

        tracing::info!(tier = ?self.config.draft_tier, "Drafting report");

        let reply = self
            .generator
            .generate(GenerationRequest {
                prompt,
                tier: self.config.draft_tier,
            })
            .await?;

        let text = reply.trim();
        if text.is_empty() {
            return Err(SummarizeError::EmptyDraft);
        }

        Ok(DraftReport::new(text))
    }
}

/// Parse the trend extraction reply
pub fn parse_trend_summary(reply: &str) -> Result<TrendSummary, String> {
    serde_json::from_str(extract_json(reply)).map_err(|e| format!("Failed to parse JSON: {}", e))
}

fn describe_most_engaged(post: &EngagedPost) -> String {
    if post.is_sentinel() {
        return NO_NOTABLE_POSTS.to_string();
    }
    format!(
        "@{}: \"{}\" ({} likes, {} reposts)",
        post.author, post.text, post.like_count, post.repost_count
    )
}
