//! Craft-bug detectors
//!
//! Each category is a pure function from one [`StepResult`] (with the
//! measurements captured while it ran) to at most one [`Finding`]. Categories
//! are independent: several may flag the same step, but a category never
//! flags a step twice. A missing measurement means no finding.

pub mod feedback;
pub mod input;
pub mod motion;
pub mod performance;

use crate::config::DetectorThresholds;
use crate::report::{Finding, StepResult};

/// Run every category against one step, in a fixed category order
pub fn detect_step(step: &StepResult, thresholds: &DetectorThresholds) -> Vec<Finding> {
    [
        performance::detect(step, thresholds),
        motion::detect(step, thresholds),
        input::detect(step, thresholds),
        feedback::detect(step, thresholds),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Run the detectors over a whole step sequence
pub fn detect_all(steps: &[StepResult], thresholds: &DetectorThresholds) -> Vec<Finding> {
    steps
        .iter()
        .flat_map(|step| detect_step(step, thresholds))
        .collect()
}
