//! Error types for scenario loading and page automation

use thiserror::Error;

use crate::runner::RunState;

/// Errors raised while loading or preparing a scenario run.
///
/// None of these escape a run: the runner folds them into a failed report.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Scenario definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid run state transition: {from} -> {to}")]
    InvalidTransition { from: RunState, to: RunState },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Structural problems in a scenario document, detected before any step runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Scenario has no steps")]
    NoSteps,

    #[error("Step {index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Step {index}: unknown action '{action}'")]
    UnknownAction { index: usize, action: String },

    #[error("Step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("Malformed scenario document: {0}")]
    Malformed(String),
}

impl DefinitionError {
    /// Step the problem was found in, if it concerns a single step
    pub fn step_index(&self) -> Option<usize> {
        match self {
            DefinitionError::MissingField { index, .. }
            | DefinitionError::UnknownAction { index, .. }
            | DefinitionError::InvalidStep { index, .. } => Some(*index),
            DefinitionError::NoSteps | DefinitionError::Malformed(_) => None,
        }
    }
}

/// Failures reported by a [`PageHandle`](crate::page::PageHandle) call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element is not input-capable: {0}")]
    NotEditable(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Page detached: {0}")]
    Detached(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Browser crashed: {0}")]
    Crashed(String),
}

impl PageError {
    /// Whether the browser can no longer serve any further step
    pub fn is_fatal(&self) -> bool {
        matches!(self, PageError::Crashed(_))
    }
}

pub type PageResult<T> = Result<T, PageError>;
