//! Browser page abstraction
//!
//! The engine talks to a browser only through [`PageHandle`]. One handle
//! serves one scenario run and is borrowed mutably by the single step that is
//! executing, so implementations need no internal locking.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PageResult;

/// Style properties that change when an element acknowledges hover/active
pub const FEEDBACK_STYLE_PROPERTIES: &[&str] = &[
    "background-color",
    "border-color",
    "box-shadow",
    "color",
    "cursor",
    "opacity",
    "outline-color",
    "outline-style",
    "text-decoration-line",
    "transform",
];

/// Computed style values of one element, keyed by CSS property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSnapshot(pub BTreeMap<String, String>);

impl StyleSnapshot {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Properties whose value differs between the two snapshots
    pub fn changed_properties(&self, other: &StyleSnapshot) -> Vec<String> {
        let mut changed: Vec<String> = self
            .0
            .iter()
            .filter(|(k, v)| other.0.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();

        for key in other.0.keys() {
            if !self.0.contains_key(key) {
                changed.push(key.clone());
            }
        }

        changed.sort();
        changed
    }
}

/// One CSS animation or transition attached to an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSample {
    pub name: String,
    pub duration_ms: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,

    /// Animated CSS properties; empty when the browser did not report them
    #[serde(default)]
    pub properties: Vec<String>,

    #[serde(default = "default_running")]
    pub running: bool,
}

fn default_running() -> bool {
    true
}

impl AnimationSample {
    /// `linear` counts as no easing: it is the browser's no-curve timing
    pub fn has_easing(&self) -> bool {
        match self.easing.as_deref().map(str::trim) {
            None | Some("") | Some("linear") => false,
            Some(_) => true,
        }
    }

    /// Two running animations fight over the element when they share a
    /// property; unknown property lists are assumed to overlap
    pub fn conflicts_with(&self, other: &AnimationSample) -> bool {
        if !self.running || !other.running {
            return false;
        }
        if self.properties.is_empty() || other.properties.is_empty() {
            return true;
        }
        self.properties.iter().any(|p| other.properties.contains(p))
    }
}

/// What the page observed between `begin_trace` and `end_trace`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionTrace {
    /// DOM mutations recorded up to the end of the feedback window
    pub mutations: u32,

    /// Mean delay from each keydown to the next DOM mutation
    #[serde(default)]
    pub keystroke_latency_ms: Option<f64>,

    /// Layout recalculations (layout-shift entries) during the trace
    #[serde(default)]
    pub layout_recalculations: Option<u32>,
}

/// A live browser page
#[async_trait]
pub trait PageHandle: Send {
    /// Load `url` and wait for the load event
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> PageResult<()>;

    /// Wait until `selector` is visible
    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()>;

    // Element operations take the time left in the step. A page must give up
    // once it runs out so later steps do not queue behind an abandoned call.

    async fn click(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()>;

    async fn hover(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()>;

    /// Focus `selector` and send `text` as individual keystrokes
    async fn type_text(&mut self, selector: &str, text: &str, timeout_ms: u64) -> PageResult<()>;

    /// Whether `selector` accepts text input
    async fn is_editable(&mut self, selector: &str, timeout_ms: u64) -> PageResult<bool>;

    /// Text of the first element matching `selector`, `None` if absent
    async fn text_content(&mut self, selector: &str, timeout_ms: u64) -> PageResult<Option<String>>;

    async fn computed_style(&mut self, selector: &str) -> PageResult<StyleSnapshot>;

    async fn animations(&mut self, selector: &str) -> PageResult<Vec<AnimationSample>>;

    /// Start recording DOM mutations, keystrokes and layout shifts
    async fn begin_trace(&mut self) -> PageResult<()>;

    /// Wait `window_ms` for late feedback, then stop recording
    async fn end_trace(&mut self, window_ms: u64) -> PageResult<InteractionTrace>;

    /// Release the browser
    async fn close(&mut self) -> PageResult<()> {
        Ok(())
    }
}

/// Opens one fresh page per scenario run
#[async_trait]
pub trait PageFactory: Send + Sync {
    type Page: PageHandle;

    async fn open(&self) -> PageResult<Self::Page>;
}
