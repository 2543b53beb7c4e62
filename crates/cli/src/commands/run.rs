//! `craftprobe run` - execute scenarios in a real browser and report craft bugs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use craftprobe_engine::playwright::check_playwright_installed;
use craftprobe_engine::scenario::load_raw;
use craftprobe_engine::{
    AnalysisReport, Browser, DefinitionError, EngineConfig, EngineError, PlaywrightFactory,
    ScenarioDefinition, ScenarioRunner,
};

use super::{collect_scenario_files, display_path, report_file_name};
use crate::output::{print_error, print_reports, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Scenario files or directories containing them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Write one JSON report per scenario into this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Scenarios to run at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Base URL for relative navigate targets
    #[arg(long, env = "CRAFTPROBE_BASE_URL")]
    pub base_url: Option<String>,
}

impl RunArgs {
    fn apply(&self, config: &mut EngineConfig) {
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.runner.concurrency = concurrency;
        }
        if let Some(base_url) = &self.base_url {
            config.runner.base_url = Some(base_url.clone());
        }
    }
}

/// Run every scenario; returns `true` when all reports completed
pub async fn execute(args: RunArgs, mut config: EngineConfig, format: OutputFormat) -> Result<bool> {
    args.apply(&mut config);

    let files = collect_scenario_files(&args.paths);
    if files.is_empty() {
        print_warning("No scenario files found.");
        return Ok(true);
    }

    let runner = ScenarioRunner::new(config.clone());

    let mut scenarios = Vec::new();
    let mut rejected: Vec<(String, DefinitionError)> = Vec::new();
    for path in &files {
        match load_scenario(path) {
            Ok(scenario) => scenarios.push(scenario),
            Err((id, err)) => {
                print_error(&format!("{}: {}", display_path(path), err));
                rejected.push((id, err));
            }
        }
    }

    if let Some(tag) = &args.tag {
        scenarios = ScenarioDefinition::filter_by_tag(scenarios, tag);
        info!(tag = %tag, selected = scenarios.len(), "filtered scenarios by tag");
    }

    let mut reports = Vec::new();
    for (id, err) in rejected {
        reports.push(runner.reject(&id, err).await);
    }

    if !scenarios.is_empty() {
        check_playwright_installed(&config.playwright).context("Playwright is required to run scenarios")?;

        let token = runner.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current step");
                token.cancel();
            }
        });

        let factory = PlaywrightFactory::new(config.playwright.clone());
        reports.extend(runner.run_many(&scenarios, &factory).await);
    }

    if let Some(dir) = &args.output {
        write_reports(&reports, dir)?;
    }

    print_reports(&reports, format);

    Ok(reports.iter().all(AnalysisReport::is_completed))
}

fn load_scenario(path: &std::path::Path) -> std::result::Result<ScenarioDefinition, (String, DefinitionError)> {
    let fallback_id = || {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| display_path(path))
    };

    let raw = load_raw(path).map_err(|e| {
        let cause = match e {
            EngineError::Definition(def) => def,
            other => DefinitionError::Malformed(other.to_string()),
        };
        (fallback_id(), cause)
    })?;

    let id = raw.scenario_id();
    raw.validate().map_err(|e| (id, e))
}

fn write_reports(reports: &[AnalysisReport], dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for report in reports {
        let path = dir.join(report_file_name(&report.scenario_id));
        let json = report.to_json_pretty()?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    print_success(&format!("{} report(s) written to {}", reports.len(), dir.display()));
    Ok(())
}
