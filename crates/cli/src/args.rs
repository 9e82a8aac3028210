//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// trend-digest: summarize what monitored accounts are posting and publish the digest
#[derive(Parser, Debug)]
#[command(name = "trend-digest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect posts, draft the digest, and publish it on a schedule
    Run(RunArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Draft the digest without publishing or persisting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Run one digest cycle and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
