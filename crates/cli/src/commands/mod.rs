//! CLI Commands

pub mod config;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};

use craftprobe_engine::scenario::scenario_files;

/// Expand directories into the scenario documents they contain
pub fn collect_scenario_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(scenario_files(path));
        } else {
            files.push(path.clone());
        }
    }
    files
}

/// File name for a scenario's report; ids may contain path separators
pub fn report_file_name(scenario_id: &str) -> String {
    let safe: String = scenario_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    format!("{}.json", safe)
}

pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
