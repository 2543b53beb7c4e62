//! craftprobe CLI - Main Entry Point
//!
//! Runs UI scenarios in a browser and reports the craft bugs found in them.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{config, run, validate};

/// craftprobe - scenario-driven UX craft-bug detection
#[derive(Parser)]
#[command(name = "craftprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML); defaults apply when it does not exist
    #[arg(short, long, default_value = "craftprobe.toml", env = "CRAFTPROBE_CONFIG", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios and score them
    Run(run::RunArgs),

    /// Check scenario documents without running them
    Validate(validate::ValidateArgs),

    /// Show or write the effective configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine_config = craftprobe_engine::EngineConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let success = match cli.command {
        Commands::Run(args) => run::execute(args, engine_config, cli.format).await?,
        Commands::Validate(args) => validate::execute(args, cli.format).await?,
        Commands::Config(args) => {
            config::execute(args, engine_config, cli.format).await?;
            true
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
