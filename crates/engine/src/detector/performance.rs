//! Step latency

use crate::config::DetectorThresholds;
use crate::report::{Category, Finding, Severity, StepResult};

/// Classify a step's duration.
///
/// Scripted waits are skipped unless they timed out: the delay was asked for
/// by the scenario, not imposed by the application. Assertions that gave up
/// on a missing element are diagnostics and are skipped too.
pub fn detect(step: &StepResult, thresholds: &DetectorThresholds) -> Option<Finding> {
    if step.timed_out {
        return Some(Finding::for_step(
            step,
            Category::Performance,
            Severity::Critical,
            format!(
                "Step {} ({} {}) never resolved; gave up after {} ms",
                step.step_index, step.action, step.target, step.duration_ms
            ),
            "The interaction hangs; look for blocked main-thread work or a request that never settles",
        ));
    }

    if !step.measures_latency() {
        return None;
    }

    let (severity, recommendation) = if step.duration_ms > thresholds.performance_high_ms {
        (
            Severity::High,
            "Users perceive more than a second as a stall; show progress or move work off the critical path",
        )
    } else if step.duration_ms > thresholds.performance_low_ms {
        (
            Severity::Low,
            "Response is noticeably delayed; profile the handler and consider optimistic UI",
        )
    } else {
        return None;
    };

    Some(Finding::for_step(
        step,
        Category::Performance,
        severity,
        format!(
            "Step {} ({} {}) took {} ms",
            step.step_index, step.action, step.target, step.duration_ms
        ),
        recommendation,
    ))
}
