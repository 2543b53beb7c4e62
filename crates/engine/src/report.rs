//! Step results, findings and the analysis report
//!
//! All types serialize with camelCase keys; the report is the document handed
//! to dashboards and report viewers.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::page::AnimationSample;
use crate::scenario::ActionKind;

// ============================================================================
// Step results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Warning,
    Failure,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Warning => write!(f, "warning"),
            StepStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Page-level signals captured while a step executed.
///
/// Every field is optional: `None` is a measurement gap and the detector
/// that needs it stays silent for the step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMeasurements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animations: Option<Vec<AnimationSample>>,

    /// Mean keypress-to-visible-mutation latency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_latency_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_style_changed: Option<bool>,

    /// DOM mutations observed inside the feedback window after a click
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutations_after_click: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_recalculations: Option<u32>,
}

impl StepMeasurements {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of one executed step. Never modified after the collector records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_index: usize,
    pub action: ActionKind,
    pub target: String,
    pub status: StepStatus,
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// The step's own timeout elapsed before it resolved
    #[serde(default)]
    pub timed_out: bool,

    /// Scripted delay (`wait` with a fixed duration)
    #[serde(default)]
    pub fixed_wait: bool,

    /// An `assert` waited out its timeout for an element that never appeared
    #[serde(default)]
    pub assertion_timed_out: bool,

    /// Selector the step interacted with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_element: Option<String>,

    #[serde(default, skip_serializing_if = "StepMeasurements::is_empty")]
    pub measurements: StepMeasurements,
}

impl StepResult {
    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failure
    }

    /// Whether `duration_ms` reflects how fast the application responded.
    /// Scripted delays and assertions left waiting for a missing element do not.
    pub fn measures_latency(&self) -> bool {
        !self.fixed_wait && !self.assertion_timed_out
    }
}

// ============================================================================
// Findings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Performance,
    Motion,
    Input,
    Feedback,
    Pattern,
    /// Synthetic findings describing why a run failed
    Execution,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Performance => "performance",
            Category::Motion => "motion",
            Category::Input => "input",
            Category::Feedback => "feedback",
            Category::Pattern => "pattern",
            Category::Execution => "execution",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// One detected craft bug or pattern issue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub category: Category,
    pub severity: Severity,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_element: Option<String>,

    pub recommendation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_step_index: Option<usize>,
}

impl Finding {
    /// Finding attached to a single step; the id is derived from category and step
    pub fn for_step(
        step: &StepResult,
        category: Category,
        severity: Severity,
        message: String,
        recommendation: &str,
    ) -> Self {
        Self {
            id: format!("{}-step-{}", category, step.step_index),
            category,
            severity,
            message,
            affected_element: step.affected_element.clone(),
            recommendation: recommendation.to_string(),
            source_step_index: Some(step.step_index),
        }
    }

    /// Synthetic finding explaining why a run did not complete
    pub fn execution_fault(kind: &str, message: String, step_index: Option<usize>) -> Self {
        Self {
            id: format!("execution-{}", kind),
            category: Category::Execution,
            severity: Severity::Critical,
            message,
            affected_element: None,
            recommendation: "Fix the scenario or the environment and re-run; no UX judgement was possible"
                .to_string(),
            source_step_index: step_index,
        }
    }
}

/// Report ordering: step index ascending (step-less findings last), then
/// severity descending, then id for a total order
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    let step_key = |f: &Finding| f.source_step_index.map_or((1, 0), |i| (0, i));

    step_key(a)
        .cmp(&step_key(b))
        .then_with(|| b.severity.cmp(&a.severity))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(compare_findings);
}

// ============================================================================
// Analysis report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Failed,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Completed => write!(f, "completed"),
            ReportStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Roll-up numbers for report viewers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub step_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub max_step_duration_ms: u64,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
    pub duration_penalty_applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub scenario_id: String,
    pub status: ReportStatus,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub overall_score: u32,
    pub step_results: Vec<StepResult>,
    pub findings: Vec<Finding>,
    pub summary: ReportSummary,
}

impl AnalysisReport {
    pub fn is_completed(&self) -> bool {
        self.status == ReportStatus::Completed
    }

    /// Findings of one category
    pub fn findings_in(&self, category: Category) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.category == category).collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
