//! Missing interaction feedback

use crate::config::DetectorThresholds;
use crate::report::{Category, Finding, Severity, StepResult};
use crate::scenario::ActionKind;

/// Hover without a style change, or a click the page never reacted to.
///
/// Failed steps are left alone: the failure is already recorded and says
/// nothing about the element's feedback.
pub fn detect(step: &StepResult, _thresholds: &DetectorThresholds) -> Option<Finding> {
    if step.is_failure() {
        return None;
    }
    let element = step.affected_element.as_deref().unwrap_or(&step.target);

    match step.action {
        ActionKind::Click if step.measurements.mutations_after_click == Some(0) => {
            Some(Finding::for_step(
                step,
                Category::Feedback,
                Severity::High,
                format!("Click on {} produced no visible response (silent failure)", element),
                "Acknowledge every click immediately: change state, show a spinner, or surface an error",
            ))
        }
        ActionKind::Hover if step.measurements.hover_style_changed == Some(false) => {
            Some(Finding::for_step(
                step,
                Category::Feedback,
                Severity::Low,
                format!("Hovering {} does not change its appearance", element),
                "Add a :hover/:active style (color, shadow or cursor) so the element reads as interactive",
            ))
        }
        _ => None,
    }
}
