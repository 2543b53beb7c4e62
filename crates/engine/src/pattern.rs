//! Cross-step pattern analysis
//!
//! Runs once over the finished step sequence and reports trends that single
//! step detectors cannot see. Each pattern yields at most one finding so a
//! systemic cause does not flood the report with near-duplicates. Messages
//! quote the average of the qualifying steps' metric.

use crate::config::{DetectorThresholds, PatternConfig};
use crate::report::{Category, Finding, Severity, StepResult};

const FRACTION_EPSILON: f64 = 1e-9;

pub fn analyze(
    steps: &[StepResult],
    thresholds: &DetectorThresholds,
    config: &PatternConfig,
) -> Vec<Finding> {
    [
        consistent_slowness(steps, thresholds, config),
        layout_thrash(steps, config),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn consistent_slowness(
    steps: &[StepResult],
    thresholds: &DetectorThresholds,
    config: &PatternConfig,
) -> Option<Finding> {
    let slow: Vec<&StepResult> = steps
        .iter()
        .filter(|s| s.measures_latency() && s.duration_ms > thresholds.performance_low_ms)
        .collect();

    if slow.len() < config.min_steps.max(1) {
        return None;
    }
    let share = slow.len() as f64 / steps.len() as f64;
    if share + FRACTION_EPSILON < config.slow_fraction {
        return None;
    }

    let average = average(slow.iter().map(|s| s.duration_ms as f64));
    let indices: Vec<String> = slow.iter().map(|s| s.step_index.to_string()).collect();

    Some(Finding {
        id: "pattern-consistent-slowness".to_string(),
        category: Category::Pattern,
        severity: Severity::Medium,
        message: format!(
            "{} of {} steps exceeded {} ms (average {:.0} ms; steps {})",
            slow.len(),
            steps.len(),
            thresholds.performance_low_ms,
            average,
            indices.join(", ")
        ),
        affected_element: None,
        recommendation: "Slowness is systemic rather than tied to one interaction; investigate shared costs such as bundle size, API latency or main-thread contention".to_string(),
        source_step_index: None,
    })
}

fn layout_thrash(steps: &[StepResult], config: &PatternConfig) -> Option<Finding> {
    let thrashing: Vec<(usize, u32)> = steps
        .iter()
        .filter_map(|s| {
            s.measurements
                .layout_recalculations
                .filter(|count| *count > config.layout_thrash_per_step)
                .map(|count| (s.step_index, count))
        })
        .collect();

    if thrashing.len() < config.min_steps.max(1) {
        return None;
    }

    let total: u64 = thrashing.iter().map(|(_, c)| u64::from(*c)).sum();
    let average = average(thrashing.iter().map(|(_, c)| f64::from(*c)));

    Some(Finding {
        id: "pattern-layout-thrash".to_string(),
        category: Category::Pattern,
        severity: Severity::Medium,
        message: format!(
            "Layout recalculated repeatedly in {} steps: {} events in total (average {:.1} per step)",
            thrashing.len(),
            total,
            average
        ),
        affected_element: None,
        recommendation: "Batch DOM reads before writes and avoid animating layout properties; prefer transform and opacity".to_string(),
        source_step_index: None,
    })
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
