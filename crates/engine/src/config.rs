//! Engine configuration
//!
//! Every threshold the detectors, the pattern analyzer and the scoring engine
//! use lives here; none of them read module-level constants.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::playwright::PlaywrightConfig;

/// Top-level engine configuration, loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub runner: RunnerConfig,
    pub thresholds: DetectorThresholds,
    pub patterns: PatternConfig,
    pub scoring: ScoringWeights,
    pub playwright: PlaywrightConfig,
}

/// Step execution and run control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Abort after this many failures in a row (0 = never abort)
    pub max_consecutive_failures: u32,

    /// Default timeout for `navigate`
    pub navigate_timeout_ms: u64,

    /// Default timeout for element waits (`click`, `hover`, `type`, `wait`, `assert`)
    pub element_timeout_ms: u64,

    /// How long to watch for DOM feedback after a click or keystrokes
    pub feedback_window_ms: u64,

    /// Base URL for relative `navigate` targets when the scenario has none
    pub base_url: Option<String>,

    /// Scenario runs scheduled at once by `run_many`
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            navigate_timeout_ms: 30_000,
            element_timeout_ms: 5_000,
            feedback_window_ms: 150,
            base_url: None,
            concurrency: 2,
        }
    }
}

/// Per-step detector thresholds. Every comparison is strict (`>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    pub performance_low_ms: u64,
    pub performance_high_ms: u64,

    /// Animations longer than this need an easing curve
    pub motion_duration_ms: f64,

    /// Conflicting animations on one element that count as a motion defect
    pub motion_conflict_count: usize,

    pub input_medium_ms: f64,
    pub input_high_ms: f64,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            performance_low_ms: 300,
            performance_high_ms: 1000,
            motion_duration_ms: 500.0,
            motion_conflict_count: 2,
            input_medium_ms: 100.0,
            input_high_ms: 200.0,
        }
    }
}

/// Cross-step pattern triggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Minimum qualifying steps before any pattern is reported
    pub min_steps: usize,

    /// Share of all steps that must be slow for consistent slowness
    pub slow_fraction: f64,

    /// Layout recalculations in one step above which the step counts as thrashing
    pub layout_thrash_per_step: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_steps: 3,
            slow_fraction: 1.0 / 3.0,
            layout_thrash_per_step: 5,
        }
    }
}

/// Score deductions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,

    /// Total run duration above which the flat penalty applies
    pub duration_budget_ms: u64,
    pub duration_penalty: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            low: 5,
            medium: 15,
            high: 30,
            critical: 50,
            duration_budget_ms: 60_000,
            duration_penalty: 20,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
