//! Declarative scenario definitions
//!
//! A scenario document is parsed in two passes. The permissive [`RawScenario`]
//! accepts anything shaped like a step list (unknown keys are ignored) so that
//! a failed report can still name the scenario; [`RawScenario::validate`]
//! then resolves every step into the closed [`StepKind`] enum. A scenario that
//! reaches the runner has only recognized actions.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DefinitionError, EngineError, EngineResult};

/// Fallback id for documents that do not name themselves
pub const UNNAMED_SCENARIO: &str = "unnamed-scenario";

static DURATION_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*(ms|s)?\s*$").expect("duration pattern is valid")
});

/// Scenario document as written, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawScenario {
    #[serde(default, alias = "name")]
    pub id: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Base for relative `navigate` targets
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// A single step as written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default, rename = "timeoutMs", alias = "timeout_ms")]
    pub timeout_ms: Option<u64>,
}

impl RawScenario {
    /// Parse a YAML (or JSON, which YAML accepts) document
    pub fn from_yaml(source: &str) -> Result<Self, DefinitionError> {
        serde_yaml::from_str(source).map_err(|e| DefinitionError::Malformed(e.to_string()))
    }

    /// Parse a strict JSON document
    pub fn from_json(source: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(source).map_err(|e| DefinitionError::Malformed(e.to_string()))
    }

    /// Scenario id, falling back to [`UNNAMED_SCENARIO`]
    pub fn scenario_id(&self) -> String {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UNNAMED_SCENARIO)
            .to_string()
    }

    /// Resolve every step into a typed [`Step`]
    pub fn validate(self) -> Result<ScenarioDefinition, DefinitionError> {
        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps);
        }

        let id = self.scenario_id();
        let steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.resolve(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScenarioDefinition {
            id,
            description: self.description,
            tags: self.tags,
            base_url: self.base_url,
            steps,
        })
    }
}

impl RawStep {
    fn resolve(self, index: usize) -> Result<Step, DefinitionError> {
        let action = self
            .action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(DefinitionError::MissingField { index, field: "action" })?;

        let kind = ActionKind::parse(action).ok_or_else(|| DefinitionError::UnknownAction {
            index,
            action: action.to_string(),
        })?;

        let target = self
            .target
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(DefinitionError::MissingField { index, field: "target" })?;

        if self.timeout_ms == Some(0) {
            return Err(DefinitionError::InvalidStep {
                index,
                reason: "timeoutMs must be greater than zero".to_string(),
            });
        }

        let kind = match kind {
            ActionKind::Navigate => StepKind::Navigate { url: target.clone() },
            ActionKind::Click => StepKind::Click { selector: target.clone() },
            ActionKind::Hover => StepKind::Hover { selector: target.clone() },
            ActionKind::Type => {
                let text = self
                    .value
                    .ok_or(DefinitionError::MissingField { index, field: "value" })?;
                StepKind::Type { selector: target.clone(), text }
            }
            ActionKind::Wait => StepKind::Wait(
                WaitTarget::parse(&target).map_err(|reason| DefinitionError::InvalidStep { index, reason })?,
            ),
            ActionKind::Assert => StepKind::Assert {
                selector: target.clone(),
                expected: self.value,
            },
        };

        Ok(Step {
            kind,
            target,
            timeout_ms: self.timeout_ms,
        })
    }
}

/// A validated scenario: every step resolved to a known action
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDefinition {
    pub id: String,
    pub description: String,
    pub tags: Vec<String>,
    pub base_url: Option<String>,
    pub steps: Vec<Step>,
}

impl ScenarioDefinition {
    /// Parse and validate a YAML (or JSON) document
    pub fn from_yaml(source: &str) -> Result<Self, DefinitionError> {
        RawScenario::from_yaml(source)?.validate()
    }

    /// Read a scenario file; the file stem names scenarios that lack an id
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let raw = load_raw(path)?;
        raw.validate().map_err(EngineError::from)
    }

    /// Keep the scenarios carrying `tag`, in their original order
    pub fn filter_by_tag(scenarios: Vec<Self>, tag: &str) -> Vec<Self> {
        scenarios
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}

/// Read a scenario file without validating it
pub fn load_raw(path: &Path) -> EngineResult<RawScenario> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);

    let mut raw = if is_json {
        RawScenario::from_json(&content)?
    } else {
        RawScenario::from_yaml(&content)?
    };

    if raw.id.as_deref().map(str::trim).unwrap_or("").is_empty() {
        raw.id = path.file_stem().map(|s| s.to_string_lossy().to_string());
    }

    Ok(raw)
}

/// Scenario documents below `dir`, sorted for a stable run order
pub fn scenario_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml" || ext == "json")
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// The six recognized actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Wait,
    Hover,
    Assert,
}

impl ActionKind {
    pub fn parse(action: &str) -> Option<Self> {
        match action.to_ascii_lowercase().as_str() {
            "navigate" => Some(ActionKind::Navigate),
            "click" => Some(ActionKind::Click),
            "type" => Some(ActionKind::Type),
            "wait" => Some(ActionKind::Wait),
            "hover" => Some(ActionKind::Hover),
            "assert" => Some(ActionKind::Assert),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Wait => "wait",
            ActionKind::Hover => "hover",
            ActionKind::Assert => "assert",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated step
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: StepKind,

    /// Target exactly as written in the document
    pub target: String,

    /// Explicit per-step timeout; action defaults apply when absent
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Navigate { url: String },
    Click { selector: String },
    Type { selector: String, text: String },
    Wait(WaitTarget),
    Hover { selector: String },
    Assert { selector: String, expected: Option<String> },
}

/// What a `wait` step waits for
#[derive(Debug, Clone, PartialEq)]
pub enum WaitTarget {
    Selector(String),
    Duration(Duration),
}

impl WaitTarget {
    /// `500`, `500ms` and `2s` are fixed delays; anything else is a selector.
    /// Fails when the delay does not fit in milliseconds.
    pub fn parse(target: &str) -> Result<Self, String> {
        let Some(caps) = DURATION_TARGET.captures(target) else {
            return Ok(WaitTarget::Selector(target.to_string()));
        };

        let too_long = || format!("wait duration '{}' is out of range", target.trim());
        let amount: u64 = caps[1].parse().map_err(|_| too_long())?;
        let millis = match caps.get(2).map(|m| m.as_str()) {
            Some("s") => amount.checked_mul(1000).ok_or_else(too_long)?,
            _ => amount,
        };
        Ok(WaitTarget::Duration(Duration::from_millis(millis)))
    }
}

impl Step {
    pub fn action(&self) -> ActionKind {
        match &self.kind {
            StepKind::Navigate { .. } => ActionKind::Navigate,
            StepKind::Click { .. } => ActionKind::Click,
            StepKind::Type { .. } => ActionKind::Type,
            StepKind::Wait(_) => ActionKind::Wait,
            StepKind::Hover { .. } => ActionKind::Hover,
            StepKind::Assert { .. } => ActionKind::Assert,
        }
    }

    /// Selector of the element this step interacts with, if any
    pub fn affected_element(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Click { selector }
            | StepKind::Type { selector, .. }
            | StepKind::Hover { selector }
            | StepKind::Assert { selector, .. }
            | StepKind::Wait(WaitTarget::Selector(selector)) => Some(selector),
            StepKind::Navigate { .. } | StepKind::Wait(WaitTarget::Duration(_)) => None,
        }
    }

    /// A scripted delay rather than a wait on the application
    pub fn is_fixed_wait(&self) -> bool {
        matches!(self.kind, StepKind::Wait(WaitTarget::Duration(_)))
    }
}
