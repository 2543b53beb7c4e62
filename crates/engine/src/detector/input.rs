//! Keystroke-to-render latency

use crate::config::DetectorThresholds;
use crate::report::{Category, Finding, Severity, StepResult};

pub fn detect(step: &StepResult, thresholds: &DetectorThresholds) -> Option<Finding> {
    let latency = step.measurements.input_latency_ms?;
    if !latency.is_finite() {
        return None;
    }

    let severity = if latency > thresholds.input_high_ms {
        Severity::High
    } else if latency > thresholds.input_medium_ms {
        Severity::Medium
    } else {
        return None;
    };

    Some(Finding::for_step(
        step,
        Category::Input,
        severity,
        format!(
            "Typing into {} shows characters after {:.0} ms on average",
            step.affected_element.as_deref().unwrap_or(&step.target),
            latency
        ),
        "Keep input handlers cheap: debounce validation and defer expensive re-renders until typing pauses",
    ))
}
