//! Telemetry collection
//!
//! Wraps every executor call for one scenario run: keeps the ordered step
//! results, updates aggregates as steps arrive and announces failures to the
//! capture hook. The collector never stops a run; it reports the current
//! failure streak and the runner decides.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::{CaptureHook, CaptureReason};
use crate::error::PageError;
use crate::executor::ActionExecutor;
use crate::page::PageHandle;
use crate::report::{StepResult, StepStatus};
use crate::scenario::Step;

/// Running totals over the steps recorded so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryAggregates {
    pub step_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub total_step_duration_ms: u64,
    pub max_step_duration_ms: u64,
    pub consecutive_failures: u32,
}

/// What the runner needs to know after a step
#[derive(Debug, Clone)]
pub struct StepSignal {
    pub status: StepStatus,
    pub consecutive_failures: u32,
    pub fault: Option<PageError>,
}

pub struct TelemetryCollector {
    hook: Arc<dyn CaptureHook>,
    results: Vec<StepResult>,
    aggregates: TelemetryAggregates,
}

impl TelemetryCollector {
    pub fn new(hook: Arc<dyn CaptureHook>) -> Self {
        Self {
            hook,
            results: Vec::new(),
            aggregates: TelemetryAggregates::default(),
        }
    }

    /// Execute `step` through `executor` and record the outcome
    pub async fn run_step<P>(
        &mut self,
        executor: &ActionExecutor,
        index: usize,
        step: &Step,
        page: &mut P,
    ) -> StepSignal
    where
        P: PageHandle + ?Sized,
    {
        let execution = executor.execute(index, step, page).await;
        let status = execution.result.status;
        self.record(execution.result).await;

        StepSignal {
            status,
            consecutive_failures: self.aggregates.consecutive_failures,
            fault: execution.fault,
        }
    }

    /// Append a finished step result
    pub async fn record(&mut self, result: StepResult) {
        let agg = &mut self.aggregates;
        agg.step_count += 1;
        agg.total_step_duration_ms += result.duration_ms;
        agg.max_step_duration_ms = agg.max_step_duration_ms.max(result.duration_ms);

        match result.status {
            StepStatus::Failure => {
                agg.error_count += 1;
                agg.consecutive_failures += 1;
            }
            StepStatus::Warning => {
                agg.warning_count += 1;
                agg.consecutive_failures = 0;
            }
            StepStatus::Success => agg.consecutive_failures = 0,
        }

        debug!(
            index = result.step_index,
            status = %result.status,
            duration_ms = result.duration_ms,
            "step recorded"
        );

        if result.is_failure() {
            let reason = CaptureReason::StepFailure {
                detail: result.error_detail.clone().unwrap_or_default(),
            };
            self.hook.capture(Some(result.step_index), &reason).await;
        }

        self.results.push(result);
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn last(&self) -> Option<&StepResult> {
        self.results.last()
    }

    pub fn aggregates(&self) -> &TelemetryAggregates {
        &self.aggregates
    }

    pub fn into_results(self) -> Vec<StepResult> {
        self.results
    }
}
