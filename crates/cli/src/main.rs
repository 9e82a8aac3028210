//! trend-digest CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;

use args::{Cli, Commands};
use config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = AppConfig::load(cli.config.as_deref())?;
            let log_level = cli
                .log_level
                .as_deref()
                .unwrap_or(&config.general.log_level);
            init_logging(log_level, config.general.log_format)?;

            commands::run::execute(args, config).await
        }
        Commands::Config(args) => {
            init_logging(
                cli.log_level.as_deref().unwrap_or("info"),
                LogFormat::Text,
            )?;
            commands::config::execute(args).await
        }
    }
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    Ok(())
}
