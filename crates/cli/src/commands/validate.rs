//! `craftprobe validate` - check scenario documents without running them

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use craftprobe_engine::scenario::load_raw;

use super::{collect_scenario_files, display_path};
use crate::output::{print_list, print_warning, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ValidateArgs {
    /// Scenario files or directories containing them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRow {
    pub file: String,
    pub scenario_id: String,
    pub steps: usize,
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableDisplay for ValidationRow {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Scenario", "Steps", "Valid", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.file.clone(),
            self.scenario_id.clone(),
            self.steps.to_string(),
            if self.valid { "✓".to_string() } else { "✗".to_string() },
            self.error.clone().unwrap_or_default(),
        ]
    }
}

pub fn validate_file(path: &std::path::Path) -> ValidationRow {
    let file = display_path(path);

    let raw = match load_raw(path) {
        Ok(raw) => raw,
        Err(e) => {
            return ValidationRow {
                file,
                scenario_id: String::new(),
                steps: 0,
                valid: false,
                error: Some(e.to_string()),
            }
        }
    };

    let scenario_id = raw.scenario_id();
    let steps = raw.steps.len();
    match raw.validate() {
        Ok(_) => ValidationRow { file, scenario_id, steps, valid: true, error: None },
        Err(e) => ValidationRow { file, scenario_id, steps, valid: false, error: Some(e.to_string()) },
    }
}

/// Returns `true` when every document is valid
pub async fn execute(args: ValidateArgs, format: OutputFormat) -> Result<bool> {
    let files = collect_scenario_files(&args.paths);
    if files.is_empty() {
        print_warning("No scenario files found.");
        return Ok(true);
    }

    let rows: Vec<ValidationRow> = files.iter().map(|p| validate_file(p)).collect();
    print_list(&rows, format);

    Ok(rows.iter().all(|r| r.valid))
}
