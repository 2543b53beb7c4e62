//! Animation timing and conflicts on the affected element

use crate::config::DetectorThresholds;
use crate::page::AnimationSample;
use crate::report::{Category, Finding, Severity, StepResult};

pub fn detect(step: &StepResult, thresholds: &DetectorThresholds) -> Option<Finding> {
    let animations = step.measurements.animations.as_ref()?;
    let element = step.affected_element.as_deref().unwrap_or(&step.target);

    let conflicting = conflicting_animations(animations);
    if conflicting.len() >= thresholds.motion_conflict_count.max(2) {
        let names: Vec<&str> = conflicting.iter().map(|a| a.name.as_str()).collect();
        return Some(Finding::for_step(
            step,
            Category::Motion,
            Severity::High,
            format!(
                "{} animations run at once on {} and animate the same properties: {}",
                conflicting.len(),
                element,
                names.join(", ")
            ),
            "Consolidate into one animation per property or sequence them; competing animations cause jank and visual jumps",
        ));
    }

    let abrupt: Vec<&AnimationSample> = animations
        .iter()
        .filter(|a| a.duration_ms > thresholds.motion_duration_ms && !a.has_easing())
        .collect();

    let longest = abrupt
        .iter()
        .max_by(|a, b| a.duration_ms.total_cmp(&b.duration_ms))?;

    Some(Finding::for_step(
        step,
        Category::Motion,
        Severity::Medium,
        format!(
            "Animation '{}' on {} runs {:.0} ms without an easing curve",
            longest.name, element, longest.duration_ms
        ),
        "Apply an easing function (e.g. ease-out) or shorten the animation; long linear motion feels mechanical",
    ))
}

/// Running animations that overlap another running animation
fn conflicting_animations(animations: &[AnimationSample]) -> Vec<&AnimationSample> {
    animations
        .iter()
        .enumerate()
        .filter(|(i, a)| {
            animations
                .iter()
                .enumerate()
                .any(|(j, b)| *i != j && a.conflicts_with(b))
        })
        .map(|(_, a)| a)
        .collect()
}
