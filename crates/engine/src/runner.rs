//! Scenario runner that orchestrates execution, detection and scoring
//!
//! A run moves through `Loaded -> Running -> {Completed, Failed}`. Whatever
//! happens, the caller gets an [`AnalysisReport`]; definition errors, browser
//! faults, aborts and cancellation all end in a `failed` report with a
//! synthetic `execution` finding and a score of zero.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{CaptureHook, CaptureReason, NoopCapture};
use crate::config::EngineConfig;
use crate::detector;
use crate::error::{DefinitionError, EngineError, EngineResult};
use crate::executor::ActionExecutor;
use crate::page::{PageFactory, PageHandle};
use crate::pattern;
use crate::report::{
    sort_findings, AnalysisReport, Finding, ReportStatus, ReportSummary, StepResult,
};
use crate::scenario::{load_raw, RawScenario, ScenarioDefinition, UNNAMED_SCENARIO};
use crate::scoring;
use crate::telemetry::{TelemetryAggregates, TelemetryCollector};

// ============================================================================
// Run state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Loaded,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Loaded, RunState::Running)
                | (RunState::Loaded, RunState::Failed)
                | (RunState::Running, RunState::Completed)
                | (RunState::Running, RunState::Failed)
        )
    }

    /// Validated transition
    pub fn transition(self, next: RunState) -> EngineResult<RunState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(EngineError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Loaded => write!(f, "loaded"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Bookkeeping for one run
struct RunContext {
    run_id: Uuid,
    scenario_id: String,
    state: RunState,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl RunContext {
    fn new(scenario_id: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario_id: scenario_id.to_string(),
            state: RunState::Loaded,
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    fn enter(&mut self, next: RunState) {
        match self.state.transition(next) {
            Ok(state) => {
                info!(
                    run_id = %self.run_id,
                    scenario = %self.scenario_id,
                    "run state {} -> {}",
                    self.state,
                    state
                );
                self.state = state;
            }
            Err(e) => error!(run_id = %self.run_id, "{}", e),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs scenarios against pages and produces analysis reports
pub struct ScenarioRunner {
    config: EngineConfig,
    hook: Arc<dyn CaptureHook>,
    cancel: CancellationToken,
}

impl ScenarioRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            hook: Arc::new(NoopCapture),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_capture(mut self, hook: Arc<dyn CaptureHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Share a cancellation token with the caller (e.g. a Ctrl-C handler)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse, validate and run a YAML or JSON scenario document
    pub async fn run_source<P>(&self, source: &str, page: &mut P) -> AnalysisReport
    where
        P: PageHandle + ?Sized,
    {
        match RawScenario::from_yaml(source) {
            Ok(raw) => self.run_raw(raw, page).await,
            Err(e) => self.reject(UNNAMED_SCENARIO, e).await,
        }
    }

    /// Load and run a scenario file
    pub async fn run_file<P>(&self, path: &Path, page: &mut P) -> AnalysisReport
    where
        P: PageHandle + ?Sized,
    {
        match load_raw(path) {
            Ok(raw) => self.run_raw(raw, page).await,
            Err(e) => {
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| UNNAMED_SCENARIO.to_string());
                let cause = match e {
                    EngineError::Definition(def) => def,
                    other => DefinitionError::Malformed(other.to_string()),
                };
                self.reject(&id, cause).await
            }
        }
    }

    /// Validate a parsed document and run it
    pub async fn run_raw<P>(&self, raw: RawScenario, page: &mut P) -> AnalysisReport
    where
        P: PageHandle + ?Sized,
    {
        let id = raw.scenario_id();
        match raw.validate() {
            Ok(scenario) => self.run(&scenario, page).await,
            Err(e) => self.reject(&id, e).await,
        }
    }

    /// Run a validated scenario on `page`
    pub async fn run<P>(&self, scenario: &ScenarioDefinition, page: &mut P) -> AnalysisReport
    where
        P: PageHandle + ?Sized,
    {
        let mut ctx = RunContext::new(&scenario.id);
        info!(
            run_id = %ctx.run_id,
            scenario = %scenario.id,
            steps = scenario.steps.len(),
            "scenario loaded"
        );
        ctx.enter(RunState::Running);

        let executor = ActionExecutor::new(&self.config.runner, scenario.base_url.clone());
        let mut collector = TelemetryCollector::new(self.hook.clone());
        let mut findings = Vec::new();
        let mut abort: Option<Finding> = None;
        let max_failures = self.config.runner.max_consecutive_failures;

        for (index, step) in scenario.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(run_id = %ctx.run_id, index, "run cancelled");
                abort = Some(Finding::execution_fault(
                    "cancelled",
                    format!("Run cancelled before step {}", index),
                    Some(index),
                ));
                break;
            }

            let signal = collector.run_step(&executor, index, step, page).await;

            if let Some(result) = collector.last() {
                for finding in detector::detect_step(result, &self.config.thresholds) {
                    self.announce(&finding).await;
                    findings.push(finding);
                }
            }

            if let Some(fault) = signal.fault {
                error!(run_id = %ctx.run_id, index, "unrecoverable page fault: {}", fault);
                abort = Some(Finding::execution_fault(
                    "fault",
                    format!("Browser fault at step {}: {}", index, fault),
                    Some(index),
                ));
                break;
            }

            if max_failures > 0 && signal.consecutive_failures >= max_failures {
                warn!(
                    run_id = %ctx.run_id,
                    index,
                    failures = signal.consecutive_failures,
                    "aborting after consecutive failures"
                );
                abort = Some(Finding::execution_fault(
                    "aborted",
                    format!(
                        "Aborted after {} consecutive step failures (last at step {})",
                        signal.consecutive_failures, index
                    ),
                    Some(index),
                ));
                break;
            }
        }

        let aggregates = collector.aggregates().clone();
        let steps = collector.into_results();

        if let Some(synthetic) = abort {
            self.announce(&synthetic).await;
            findings.push(synthetic);
            ctx.enter(RunState::Failed);
            return self.build_report(&ctx, steps, findings, &aggregates);
        }

        for finding in pattern::analyze(&steps, &self.config.thresholds, &self.config.patterns) {
            self.announce(&finding).await;
            findings.push(finding);
        }

        ctx.enter(RunState::Completed);
        let report = self.build_report(&ctx, steps, findings, &aggregates);
        info!(
            run_id = %report.run_id,
            scenario = %report.scenario_id,
            score = report.overall_score,
            findings = report.findings.len(),
            duration_ms = report.total_duration_ms,
            "scenario completed"
        );
        report
    }

    /// Run independent scenarios concurrently, each on its own page.
    ///
    /// Reports come back in input order.
    pub async fn run_many<F>(&self, scenarios: &[ScenarioDefinition], factory: &F) -> Vec<AnalysisReport>
    where
        F: PageFactory,
    {
        let concurrency = self.config.runner.concurrency.max(1);
        info!(scenarios = scenarios.len(), concurrency, "running scenarios");

        let mut reports: Vec<(usize, AnalysisReport)> = stream::iter(scenarios.iter().enumerate())
            .map(|(position, scenario)| async move {
                let report = match factory.open().await {
                    Ok(mut page) => {
                        let report = self.run(scenario, &mut page).await;
                        if let Err(e) = page.close().await {
                            warn!(scenario = %scenario.id, "failed to close page: {}", e);
                        }
                        report
                    }
                    Err(e) => self.page_failure(&scenario.id, e.to_string()).await,
                };
                (position, report)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        reports.sort_by_key(|(position, _)| *position);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    async fn announce(&self, finding: &Finding) {
        debug!(id = %finding.id, severity = %finding.severity, "finding emitted");
        self.hook
            .capture(finding.source_step_index, &CaptureReason::for_finding(finding))
            .await;
    }

    /// Failed report for a scenario that cannot run
    pub async fn reject(&self, scenario_id: &str, err: DefinitionError) -> AnalysisReport {
        let mut ctx = RunContext::new(scenario_id);
        warn!(run_id = %ctx.run_id, scenario = %scenario_id, "invalid scenario: {}", err);

        let finding = Finding::execution_fault("definition", err.to_string(), err.step_index());
        self.announce(&finding).await;
        ctx.enter(RunState::Failed);
        self.build_report(&ctx, Vec::new(), vec![finding], &TelemetryAggregates::default())
    }

    async fn page_failure(&self, scenario_id: &str, detail: String) -> AnalysisReport {
        let mut ctx = RunContext::new(scenario_id);
        error!(run_id = %ctx.run_id, scenario = %scenario_id, "could not open page: {}", detail);

        let finding = Finding::execution_fault("page", format!("Could not open a page: {}", detail), None);
        self.announce(&finding).await;
        ctx.enter(RunState::Failed);
        self.build_report(&ctx, Vec::new(), vec![finding], &TelemetryAggregates::default())
    }

    fn build_report(
        &self,
        ctx: &RunContext,
        step_results: Vec<StepResult>,
        mut findings: Vec<Finding>,
        aggregates: &TelemetryAggregates,
    ) -> AnalysisReport {
        let total_duration_ms = ctx.elapsed_ms();
        sort_findings(&mut findings);

        let breakdown = scoring::breakdown(&findings, total_duration_ms, &self.config.scoring);
        let (status, overall_score) = match ctx.state {
            RunState::Completed => (ReportStatus::Completed, breakdown.score),
            _ => (ReportStatus::Failed, 0),
        };

        AnalysisReport {
            run_id: ctx.run_id,
            scenario_id: ctx.scenario_id.clone(),
            status,
            started_at: ctx.started_at,
            total_duration_ms,
            overall_score,
            step_results,
            findings,
            summary: ReportSummary {
                step_count: aggregates.step_count,
                error_count: aggregates.error_count,
                warning_count: aggregates.warning_count,
                max_step_duration_ms: aggregates.max_step_duration_ms,
                low: breakdown.low,
                medium: breakdown.medium,
                high: breakdown.high,
                critical: breakdown.critical,
                duration_penalty_applied: breakdown.duration_penalty_applied,
            },
        }
    }
}
