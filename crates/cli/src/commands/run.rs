//! Run command - collect, summarize, and publish the trend digest

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::interval;
use trend_digest_adapters::{
    llm::{
        AnthropicGenerator, LlmConfig as AdapterLlmConfig, OpenAiCompatGenerator,
        OpenAiGenerator, StubGenerator,
    },
    state::{InMemoryStateStore, SqliteStateStore},
    x::{StubPostSource, XPostSource, XPublisher},
};
use trend_digest_domain::{
    CycleOutcome, PostSource, Publisher, StateStore, SystemClock, TextGenerator,
    usecases::DigestPipeline,
};

use crate::args::RunArgs;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config: AppConfig) -> Result<()> {
    if config.watch.accounts.is_empty() {
        tracing::info!("No accounts configured, nothing to do");
        return Ok(());
    }

    let write_disabled = !config.x.write.enabled;
    let dry_run = args.dry_run || config.general.dry_run || write_disabled;
    if write_disabled && !(args.dry_run || config.general.dry_run) {
        tracing::info!("X writes are disabled, running as dry run");
    }

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        accounts = ?config.watch.accounts,
        provider = %config.llm.provider,
        "Starting trend-digest run"
    );

    // Build dependencies
    let state_store: Arc<dyn StateStore> = if dry_run {
        Arc::new(InMemoryStateStore::new())
    } else {
        Arc::new(
            SqliteStateStore::new(&config.general.state_db_path)
                .await
                .context("Failed to initialize SQLite state store")?,
        )
    };

    let post_source = build_post_source(&config)?;
    let generator: Arc<dyn TextGenerator> = Arc::from(build_generator(&config)?);
    let publisher: Arc<dyn Publisher> = Arc::new(build_x_publisher(&config, dry_run)?);
    let clock = Arc::new(SystemClock);

    let pipeline = DigestPipeline::new(
        post_source,
        generator,
        publisher,
        state_store,
        clock,
        config.digest_config(dry_run)?,
    );

    if args.once {
        tracing::info!("Running single digest cycle");
        return match pipeline.run_digest_cycle().await {
            CycleOutcome::Failed { stage, error } => {
                bail!("Digest cycle failed during {}: {}", stage, error)
            }
            outcome => {
                report_outcome(&outcome);
                Ok(())
            }
        };
    }

    let mut ticker = interval(Duration::from_secs(config.watch.interval_secs));

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = pipeline.run_digest_cycle().await;
                report_outcome(&outcome);
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    tracing::info!("trend-digest run completed");
    Ok(())
}

/// Print drafted reports so dry runs can be reviewed
fn report_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Drafted { report } => {
            println!("{}", report.text);
        }
        CycleOutcome::Published { result } => {
            println!("Published: {}", result.url);
        }
        CycleOutcome::Skipped { reason } => {
            tracing::debug!(reason = ?reason, "Cycle skipped");
        }
        CycleOutcome::Failed { .. } => {}
    }
}

fn build_post_source(config: &AppConfig) -> Result<Arc<dyn PostSource>> {
    match config.x.read.provider.as_str() {
        "x" => {
            let bearer_token = load_api_key(&config.x.read.bearer_token_env, "x_read")?;
            Ok(Arc::new(XPostSource::new(bearer_token)))
        }
        "stub" => {
            tracing::info!("Using canned posts instead of the X API");
            Ok(Arc::new(StubPostSource::sample(
                &config.watch.accounts,
                OffsetDateTime::now_utc(),
            )))
        }
        other => bail!("Unknown X read provider: {}", other),
    }
}

fn build_x_publisher(config: &AppConfig, dry_run: bool) -> Result<XPublisher> {
    if dry_run || !config.x.write.enabled {
        return Ok(XPublisher::disabled(config.agent.handle.clone()));
    }

    let user_token = load_api_key(&config.x.write.oauth2_user_token_env, "x_write")?;
    Ok(XPublisher::new(
        user_token,
        config.agent.handle.clone(),
        config.x.write.max_chars,
    ))
}

pub(crate) fn build_generator(config: &AppConfig) -> Result<Box<dyn TextGenerator>> {
    let llm_config = adapter_llm_config(&config.llm);

    match config.llm.provider.as_str() {
        "openai" => {
            let api_key = load_api_key(&config.llm.openai.api_key_env, "openai")?;
            Ok(Box::new(OpenAiGenerator::with_base_url(
                api_key,
                config.llm.openai.base_url.clone(),
                llm_config,
            )))
        }
        "anthropic" => {
            let api_key = load_api_key(&config.llm.anthropic.api_key_env, "anthropic")?;
            Ok(Box::new(AnthropicGenerator::with_base_url(
                api_key,
                config.llm.anthropic.base_url.clone(),
                llm_config,
            )))
        }
        "openai_compat" => {
            let base_url = config.llm.openai_compat.base_url.trim();
            if base_url.is_empty() {
                bail!("OpenAI-compatible base_url is required");
            }
            let api_key = load_api_key(&config.llm.openai_compat.api_key_env, "openai_compat")?;
            Ok(Box::new(OpenAiCompatGenerator::new(
                api_key,
                base_url.to_string(),
                llm_config,
            )))
        }
        "stub" => Ok(Box::new(StubGenerator::canned())),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

fn adapter_llm_config(config: &crate::config::LlmConfig) -> AdapterLlmConfig {
    AdapterLlmConfig {
        small_model: config.small_model.clone(),
        medium_model: config.medium_model.clone(),
        large_model: config.large_model.clone(),
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
        timeout_secs: config.timeout_secs,
        retries: config.retries,
    }
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!(
            "API key env var {} is empty for provider {}",
            env_var,
            provider
        );
    }

    Ok(SecretString::new(key.into()))
}
