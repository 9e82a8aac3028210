//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trend_digest_domain::usecases::{
    CollectConfig, DigestConfig, PublishConfig, SummarizeConfig, TREND_REPORT_SOURCE,
};
use trend_digest_domain::policy::DraftPolicy;
use trend_digest_domain::{ModelTier, SearchMode};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub x: XConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub accounts: Vec<String>,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_posts_per_account")]
    pub posts_per_account: usize,

    #[serde(default = "default_recency_window_hours")]
    pub recency_window_hours: u64,

    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    #[serde(default = "default_fetch_jitter_ms")]
    pub fetch_jitter_ms: u64,

    #[serde(default)]
    pub search_mode: SearchMode,

    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Handle of the publishing account
    #[serde(default = "default_agent_handle")]
    pub handle: String,

    #[serde(default = "default_agent_bio")]
    pub bio: String,

    #[serde(default = "default_agent_style")]
    pub style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_hashtags")]
    pub top_hashtags: usize,

    /// Ceiling for the drafted report, long-form included
    #[serde(default = "default_report_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_max_hashtags")]
    pub max_hashtags: usize,

    #[serde(default = "default_extraction_tier")]
    pub extraction_tier: ModelTier,

    #[serde(default = "default_draft_tier")]
    pub draft_tier: ModelTier,

    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_small_model")]
    pub small_model: String,

    #[serde(default = "default_medium_model")]
    pub medium_model: String,

    #[serde(default = "default_large_model")]
    pub large_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub openai_compat: OpenAiCompatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    #[serde(default)]
    pub api_key_env: String,

    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub read: XReadConfig,

    #[serde(default)]
    pub write: XWriteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XReadConfig {
    /// `x` for the live API, `stub` for canned posts
    #[serde(default = "default_x_read_provider")]
    pub provider: String,

    #[serde(default = "default_x_bearer_token_env")]
    pub bearer_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XWriteConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_x_user_token_env")]
    pub oauth2_user_token_env: String,

    /// Standard post ceiling
    #[serde(default = "default_x_max_chars")]
    pub max_chars: usize,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./state.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    3600
}

fn default_posts_per_account() -> usize {
    10
}

fn default_recency_window_hours() -> u64 {
    24
}

fn default_fetch_delay_ms() -> u64 {
    2000
}

fn default_fetch_jitter_ms() -> u64 {
    2000
}

fn default_agent_name() -> String {
    "Trend Digest".to_string()
}

fn default_agent_handle() -> String {
    "trend_digest".to_string()
}

fn default_agent_bio() -> String {
    "You track what monitored accounts are talking about.".to_string()
}

fn default_agent_style() -> String {
    "Concise, neutral and data-driven.".to_string()
}

fn default_top_hashtags() -> usize {
    3
}

fn default_report_max_chars() -> usize {
    4000
}

fn default_max_hashtags() -> usize {
    3
}

fn default_extraction_tier() -> ModelTier {
    ModelTier::Small
}

fn default_draft_tier() -> ModelTier {
    ModelTier::Large
}

fn default_embedding_dims() -> usize {
    1536
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_small_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_medium_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_large_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout() -> u64 {
    60
}

fn default_llm_retries() -> u32 {
    2
}

fn default_max_output_tokens() -> u32 {
    1500
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_x_read_provider() -> String {
    "x".to_string()
}

fn default_x_bearer_token_env() -> String {
    "X_BEARER_TOKEN".to_string()
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_max_chars() -> usize {
    280
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            dry_run: default_true(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            accounts: vec![],
            interval_secs: default_interval(),
            posts_per_account: default_posts_per_account(),
            recency_window_hours: default_recency_window_hours(),
            fetch_delay_ms: default_fetch_delay_ms(),
            fetch_jitter_ms: default_fetch_jitter_ms(),
            search_mode: SearchMode::default(),
            ignore_patterns: vec![],
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            handle: default_agent_handle(),
            bio: default_agent_bio(),
            style: default_agent_style(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_hashtags: default_top_hashtags(),
            max_chars: default_report_max_chars(),
            max_hashtags: default_max_hashtags(),
            extraction_tier: default_extraction_tier(),
            draft_tier: default_draft_tier(),
            embedding_dims: default_embedding_dims(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            small_model: default_small_model(),
            medium_model: default_medium_model(),
            large_model: default_large_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            retries: default_llm_retries(),
            max_output_tokens: default_max_output_tokens(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            openai_compat: OpenAiCompatConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_api_key_env(),
            base_url: default_anthropic_base_url(),
        }
    }
}

impl Default for XReadConfig {
    fn default() -> Self {
        Self {
            provider: default_x_read_provider(),
            bearer_token_env: default_x_bearer_token_env(),
        }
    }
}

impl Default for XWriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            oauth2_user_token_env: default_x_user_token_env(),
            max_chars: default_x_max_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("TREND_DIGEST")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("watch.accounts")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Pipeline configuration for one digest cycle
    pub fn digest_config(&self, dry_run: bool) -> Result<DigestConfig> {
        let recency_secs = i64::try_from(self.watch.recency_window_hours)
            .ok()
            .and_then(|hours| hours.checked_mul(3600))
            .with_context(|| {
                format!(
                    "watch.recency_window_hours is out of range: {}",
                    self.watch.recency_window_hours
                )
            })?;

        Ok(DigestConfig {
            accounts: self.watch.accounts.clone(),
            dry_run,
            top_hashtags: self.report.top_hashtags,
            collect: CollectConfig {
                posts_per_account: self.watch.posts_per_account,
                recency_window: time::Duration::seconds(recency_secs),
                fetch_delay: Duration::from_millis(self.watch.fetch_delay_ms),
                fetch_jitter: Duration::from_millis(self.watch.fetch_jitter_ms),
                search_mode: self.watch.search_mode,
                ignore_patterns: self.watch.ignore_patterns.clone(),
            },
            summarize: SummarizeConfig {
                agent_name: self.agent.name.clone(),
                bio: self.agent.bio.clone(),
                style: self.agent.style.clone(),
                extraction_tier: self.report.extraction_tier,
                draft_tier: self.report.draft_tier,
                max_chars: self.report.max_chars,
                max_hashtags: self.report.max_hashtags,
            },
            publish: PublishConfig {
                standard_max_chars: self.x.write.max_chars,
                agent_name: self.agent.name.clone(),
                source: TREND_REPORT_SOURCE.to_string(),
                embedding_dims: self.report.embedding_dims,
            },
            draft_policy: DraftPolicy::new(self.report.max_chars, self.report.max_hashtags),
        })
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# trend-digest configuration

[general]
state_db_path = "./state.sqlite"
log_level = "info"
log_format = "text"  # text, json
dry_run = true

[watch]
accounts = ["example_account_1", "example_account_2"]
interval_secs = 3600
posts_per_account = 10
recency_window_hours = 24
fetch_delay_ms = 2000
fetch_jitter_ms = 2000
search_mode = "latest"  # latest, top
# ignore_patterns = ["^AD:", "giveaway"]

[agent]
name = "Trend Digest"
handle = "trend_digest"
bio = "You track what monitored accounts are talking about."
style = "Concise, neutral and data-driven."

[report]
top_hashtags = 3
max_chars = 4000
max_hashtags = 3
extraction_tier = "small"  # small, medium, large
draft_tier = "large"
embedding_dims = 1536

[llm]
provider = "openai"  # openai, anthropic, openai_compat, stub
small_model = "gpt-4o-mini"
medium_model = "gpt-4o-mini"
large_model = "gpt-4o"
temperature = 0.7
timeout_secs = 60
retries = 2
max_output_tokens = 1500

[llm.openai]
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"

[llm.anthropic]
api_key_env = "ANTHROPIC_API_KEY"
base_url = "https://api.anthropic.com"

[llm.openai_compat]
api_key_env = "LLM_API_KEY"
base_url = "https://your-provider.com/v1"

[x.read]
provider = "x"  # x, stub
bearer_token_env = "X_BEARER_TOKEN"

[x.write]
enabled = false
oauth2_user_token_env = "X_USER_TOKEN"
max_chars = 280
"#
        .to_string()
    }
}
