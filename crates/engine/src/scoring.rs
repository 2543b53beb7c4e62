//! UX score
//!
//! The score starts at 100 and loses a fixed weight per finding severity,
//! plus a flat penalty when the whole run was slow. Deductions are summed
//! before clamping, so the result does not depend on finding order.

use crate::config::ScoringWeights;
use crate::report::{Finding, Severity};

pub const MAX_SCORE: u32 = 100;

/// Per-severity counts and what they cost
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
    pub finding_deduction: u64,
    pub duration_penalty_applied: bool,
    pub score: u32,
}

pub fn weight(severity: Severity, weights: &ScoringWeights) -> u32 {
    match severity {
        Severity::Low => weights.low,
        Severity::Medium => weights.medium,
        Severity::High => weights.high,
        Severity::Critical => weights.critical,
    }
}

/// Score a finding set for a run that took `total_duration_ms`
pub fn score(findings: &[Finding], total_duration_ms: u64, weights: &ScoringWeights) -> u32 {
    breakdown(findings, total_duration_ms, weights).score
}

pub fn breakdown(findings: &[Finding], total_duration_ms: u64, weights: &ScoringWeights) -> ScoreBreakdown {
    let mut result = ScoreBreakdown::default();

    for finding in findings {
        match finding.severity {
            Severity::Low => result.low += 1,
            Severity::Medium => result.medium += 1,
            Severity::High => result.high += 1,
            Severity::Critical => result.critical += 1,
        }
        result.finding_deduction += u64::from(weight(finding.severity, weights));
    }

    result.duration_penalty_applied = total_duration_ms > weights.duration_budget_ms;

    let mut deduction = result.finding_deduction;
    if result.duration_penalty_applied {
        deduction += u64::from(weights.duration_penalty);
    }

    result.score = u64::from(MAX_SCORE).saturating_sub(deduction) as u32;
    result
}
