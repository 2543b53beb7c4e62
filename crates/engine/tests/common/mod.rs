//! Scripted in-memory page for driving the engine without a browser.
//!
//! Every delay is a `tokio::time::sleep`, so tests running with
//! `start_paused = true` see exact, deterministic durations.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use craftprobe_engine::{
    AnimationSample, InteractionTrace, PageError, PageFactory, PageHandle, PageResult,
    StyleSnapshot,
};

/// Behavior of one element on the fake page
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub text: Option<String>,
    pub editable: bool,
    pub click_delay: Duration,
    pub mutations_on_click: u32,
    pub hover_feedback: bool,
    pub animations: Vec<AnimationSample>,
    pub keystroke_latency_ms: Option<f64>,
    pub layout_recalculations: Option<u32>,
    pub crash_on_click: bool,
    pub appears_after: Duration,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            text: None,
            editable: false,
            click_delay: Duration::ZERO,
            mutations_on_click: 1,
            hover_feedback: true,
            animations: Vec::new(),
            keystroke_latency_ms: None,
            layout_recalculations: None,
            crash_on_click: false,
            appears_after: Duration::ZERO,
        }
    }
}

impl FakeElement {
    pub fn button() -> Self {
        Self::default()
    }

    pub fn input() -> Self {
        Self {
            editable: true,
            keystroke_latency_ms: Some(16.0),
            ..Self::default()
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn click_delay_ms(mut self, ms: u64) -> Self {
        self.click_delay = Duration::from_millis(ms);
        self
    }

    pub fn silent(mut self) -> Self {
        self.mutations_on_click = 0;
        self
    }

    pub fn no_hover_feedback(mut self) -> Self {
        self.hover_feedback = false;
        self
    }

    pub fn keystroke_latency(mut self, ms: f64) -> Self {
        self.keystroke_latency_ms = Some(ms);
        self
    }

    pub fn layout_recalculations(mut self, count: u32) -> Self {
        self.layout_recalculations = Some(count);
        self
    }

    pub fn animation(mut self, name: &str, duration_ms: f64, easing: Option<&str>, properties: &[&str]) -> Self {
        self.animations.push(AnimationSample {
            name: name.to_string(),
            duration_ms,
            easing: easing.map(String::from),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            running: true,
        });
        self
    }

    /// Element shows up this long after a wait for it starts
    pub fn appears_after_ms(mut self, ms: u64) -> Self {
        self.appears_after = Duration::from_millis(ms);
        self
    }

    pub fn crashes(mut self) -> Self {
        self.crash_on_click = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, FakeElement>,
    navigate_delay: Duration,
    hovered: Option<String>,
    traced: Option<String>,
    typed: HashMap<String, String>,
    calls: Arc<Mutex<Vec<String>>>,
    budgets: Arc<Mutex<Vec<(String, u64)>>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: &str, element: FakeElement) -> Self {
        self.elements.insert(selector.to_string(), element);
        self
    }

    pub fn navigate_delay_ms(mut self, ms: u64) -> Self {
        self.navigate_delay = Duration::from_millis(ms);
        self
    }

    /// Every page call made so far, as `op:target`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Timeout handed to each element operation, keyed `op:target`
    pub fn budgets(&self) -> Vec<(String, u64)> {
        self.budgets.lock().clone()
    }

    fn log(&self, op: &str, target: &str) {
        self.calls.lock().push(format!("{}:{}", op, target));
    }

    fn log_budget(&self, op: &str, target: &str, timeout_ms: u64) {
        self.budgets.lock().push((format!("{}:{}", op, target), timeout_ms));
    }

    fn element(&self, selector: &str) -> PageResult<&FakeElement> {
        self.elements
            .get(selector)
            .ok_or_else(|| PageError::ElementNotFound(selector.to_string()))
    }

    fn base_style() -> StyleSnapshot {
        StyleSnapshot::from_pairs([("background-color", "rgb(255, 255, 255)"), ("cursor", "auto")])
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> PageResult<()> {
        self.log("navigate", url);
        tokio::time::sleep(self.navigate_delay).await;
        self.hovered = None;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()> {
        self.log("wait", selector);
        let limit = Duration::from_millis(timeout_ms);
        if let Some(element) = self.elements.get(selector) {
            if element.appears_after <= limit {
                tokio::time::sleep(element.appears_after).await;
                return Ok(());
            }
        }
        tokio::time::sleep(limit).await;
        Err(PageError::Timeout(timeout_ms))
    }

    async fn click(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()> {
        self.log("click", selector);
        self.log_budget("click", selector, timeout_ms);
        let element = self.element(selector)?.clone();
        if element.crash_on_click {
            return Err(PageError::Crashed("renderer process gone".to_string()));
        }
        tokio::time::sleep(element.click_delay).await;
        self.traced = Some(selector.to_string());
        Ok(())
    }

    async fn hover(&mut self, selector: &str, timeout_ms: u64) -> PageResult<()> {
        self.log("hover", selector);
        self.log_budget("hover", selector, timeout_ms);
        self.element(selector)?;
        self.hovered = Some(selector.to_string());
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str, timeout_ms: u64) -> PageResult<()> {
        self.log("type", selector);
        self.log_budget("type", selector, timeout_ms);
        self.element(selector)?;
        self.typed.insert(selector.to_string(), text.to_string());
        self.traced = Some(selector.to_string());
        Ok(())
    }

    async fn is_editable(&mut self, selector: &str, timeout_ms: u64) -> PageResult<bool> {
        self.log_budget("editable", selector, timeout_ms);
        Ok(self.element(selector)?.editable)
    }

    async fn text_content(&mut self, selector: &str, timeout_ms: u64) -> PageResult<Option<String>> {
        self.log_budget("text", selector, timeout_ms);
        if let Some(typed) = self.typed.get(selector) {
            return Ok(Some(typed.clone()));
        }
        Ok(self.element(selector)?.text.clone())
    }

    async fn computed_style(&mut self, selector: &str) -> PageResult<StyleSnapshot> {
        let element = self.element(selector)?;
        let mut style = Self::base_style();
        if element.hover_feedback && self.hovered.as_deref() == Some(selector) {
            style.0.insert("background-color".to_string(), "rgb(230, 230, 230)".to_string());
            style.0.insert("cursor".to_string(), "pointer".to_string());
        }
        Ok(style)
    }

    async fn animations(&mut self, selector: &str) -> PageResult<Vec<AnimationSample>> {
        Ok(self.element(selector)?.animations.clone())
    }

    async fn begin_trace(&mut self) -> PageResult<()> {
        self.traced = None;
        Ok(())
    }

    async fn end_trace(&mut self, window_ms: u64) -> PageResult<InteractionTrace> {
        tokio::time::sleep(Duration::from_millis(window_ms)).await;

        let Some(selector) = self.traced.take() else {
            return Ok(InteractionTrace::default());
        };
        let element = self.element(&selector)?;
        Ok(InteractionTrace {
            mutations: element.mutations_on_click,
            keystroke_latency_ms: element.keystroke_latency_ms,
            layout_recalculations: element.layout_recalculations,
        })
    }
}

/// Hands out clones of a template page
pub struct FakeFactory {
    pub template: FakePage,
}

#[async_trait]
impl PageFactory for FakeFactory {
    type Page = FakePage;

    async fn open(&self) -> PageResult<FakePage> {
        Ok(self.template.clone())
    }
}

/// Standard page for most tests
pub fn shop_page() -> FakePage {
    FakePage::new()
        .with("#buy", FakeElement::button())
        .with("#slow-buy", FakeElement::button().click_delay_ms(2000))
        .with("#title", FakeElement::text("Welcome"))
        .with("#search", FakeElement::input())
}
