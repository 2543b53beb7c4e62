//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use craftprobe_engine::{AnalysisReport, Finding, ReportStatus, Severity};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn new_table(headers: Vec<&'static str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() && format == OutputFormat::Table {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = new_table(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
    }
}

impl TableDisplay for AnalysisReport {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Status", "Score", "Steps", "Errors", "Warnings", "Findings", "Duration"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.scenario_id.clone(),
            status_label(self.status),
            self.overall_score.to_string(),
            self.summary.step_count.to_string(),
            self.summary.error_count.to_string(),
            self.summary.warning_count.to_string(),
            self.findings.len().to_string(),
            format!("{} ms", self.total_duration_ms),
        ]
    }
}

impl TableDisplay for Finding {
    fn headers() -> Vec<&'static str> {
        vec!["Step", "Category", "Severity", "Element", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.source_step_index
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.category.to_string(),
            severity_label(self.severity),
            self.affected_element.clone().unwrap_or_default(),
            self.message.clone(),
        ]
    }
}

/// Print run results: a summary table plus the findings of each report
pub fn print_reports(reports: &[AnalysisReport], format: OutputFormat) {
    print_list(reports, format);
    if format != OutputFormat::Table {
        return;
    }

    for report in reports.iter().filter(|r| !r.findings.is_empty()) {
        println!();
        println!("{} {}", "Findings for".bold(), report.scenario_id.bold());

        let mut table = new_table(Finding::headers());
        for finding in &report.findings {
            table.add_row(finding.row());
        }
        println!("{table}");
    }
}

fn status_label(status: ReportStatus) -> String {
    match status {
        ReportStatus::Completed => status.to_string().green().to_string(),
        ReportStatus::Failed => status.to_string().red().bold().to_string(),
    }
}

fn severity_label(severity: Severity) -> String {
    let label = severity.to_string();
    match severity {
        Severity::Low => label.normal().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::High => label.red().to_string(),
        Severity::Critical => label.red().bold().to_string(),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}
