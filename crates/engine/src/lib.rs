//! craftprobe engine
//!
//! Executes declarative UI scenarios against a browser page and turns the
//! observed behavior into a scored UX report:
//! - Parses YAML/JSON scenario definitions into a closed set of step kinds
//! - Drives a page (Playwright via a Node.js driver, or any [`PageHandle`])
//! - Detects craft bugs per step and recurring patterns across steps
//! - Scores the run from 0 to 100
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ScenarioRunner (state machine)             │
//! │        Loaded ──▶ Running ──▶ { Completed, Failed }         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  for each step:                                             │
//! │    TelemetryCollector.run_step()                            │
//! │      └── ActionExecutor.execute(step, &mut PageHandle)      │
//! │    detector::detect_step()  ──▶ CaptureHook                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  after the last step:                                       │
//! │    pattern::analyze()  ──▶ scoring::breakdown()             │
//! │    AnalysisReport { stepResults, findings, overallScore }   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod executor;
pub mod page;
pub mod pattern;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod scoring;
pub mod telemetry;

pub use capture::{CaptureHook, CaptureReason, NoopCapture, RecordingCapture};
pub use config::{DetectorThresholds, EngineConfig, PatternConfig, RunnerConfig, ScoringWeights};
pub use error::{DefinitionError, EngineError, EngineResult, PageError, PageResult};
pub use page::{AnimationSample, InteractionTrace, PageFactory, PageHandle, StyleSnapshot};
pub use playwright::{Browser, PlaywrightConfig, PlaywrightFactory, PlaywrightPage};
pub use report::{AnalysisReport, Category, Finding, ReportStatus, Severity, StepResult, StepStatus};
pub use runner::{RunState, ScenarioRunner};
pub use scenario::{ActionKind, RawScenario, ScenarioDefinition, Step, StepKind};
