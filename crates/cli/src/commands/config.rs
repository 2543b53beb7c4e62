//! `craftprobe config` - show or write the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use craftprobe_engine::EngineConfig;

use crate::output::{print_success, OutputFormat};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration to this path instead of printing it
    #[arg(long)]
    pub write: Option<PathBuf>,
}

pub async fn execute(args: ConfigArgs, config: EngineConfig, format: OutputFormat) -> Result<()> {
    if let Some(path) = args.write {
        config
            .save(&path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        print_success(&format!("Configuration written to {}", path.display()));
        return Ok(());
    }

    match format {
        OutputFormat::Table => print!("{}", config.to_toml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&config)?),
    }
    Ok(())
}
