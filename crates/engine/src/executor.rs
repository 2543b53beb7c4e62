//! Action executor
//!
//! Runs one validated step against a page. Every path ends in a
//! [`StepResult`]: page errors become `failure` (or `warning` for asserts),
//! and nothing propagates past this boundary. Browser crashes are reported
//! alongside the result as a `fault` so the runner can stop.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::error::{PageError, PageResult};
use crate::page::{PageHandle, StyleSnapshot};
use crate::report::{StepMeasurements, StepResult, StepStatus};
use crate::scenario::{Step, StepKind, WaitTarget};

/// Slack on top of a step timeout before the pending page call is abandoned,
/// so the driver gets to report its own timeout first
const TIMEOUT_GRACE: Duration = Duration::from_millis(250);

/// Result of executing one step
#[derive(Debug, Clone)]
pub struct StepExecution {
    pub result: StepResult,

    /// Set when the browser can no longer serve further steps
    pub fault: Option<PageError>,
}

/// What the interaction left behind for the measurement phase
#[derive(Debug, Default)]
struct Dispatched {
    warning: Option<String>,
    assertion_timed_out: bool,
    trace_armed: bool,
    style_before: Option<StyleSnapshot>,
}

#[derive(Debug, Default)]
struct AssertionOutcome {
    warning: Option<String>,
    /// The element never appeared within the step timeout
    waited_out: bool,
}

pub struct ActionExecutor {
    config: RunnerConfig,
    base_url: Option<String>,
}

impl ActionExecutor {
    /// `base_url` resolves relative `navigate` targets; falls back to the
    /// configured one
    pub fn new(config: &RunnerConfig, base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.or_else(|| config.base_url.clone()),
            config: config.clone(),
        }
    }

    /// Effective timeout of a step; `None` for a fixed wait without an explicit one
    pub fn timeout_for(&self, step: &Step) -> Option<Duration> {
        let default_ms = match &step.kind {
            StepKind::Navigate { .. } => Some(self.config.navigate_timeout_ms),
            StepKind::Wait(WaitTarget::Duration(_)) => None,
            _ => Some(self.config.element_timeout_ms),
        };
        step.timeout_ms.or(default_ms).map(Duration::from_millis)
    }

    /// Resolve a navigate target against the base URL
    pub fn resolve_url(&self, url: &str) -> String {
        let absolute = ["http://", "https://", "file://", "about:", "data:"]
            .iter()
            .any(|scheme| url.starts_with(scheme));

        match &self.base_url {
            Some(base) if !absolute => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            _ => url.to_string(),
        }
    }

    /// Execute one step and time it
    pub async fn execute<P>(&self, index: usize, step: &Step, page: &mut P) -> StepExecution
    where
        P: PageHandle + ?Sized,
    {
        let timestamp = Utc::now();
        let limit = self.timeout_for(step);
        debug!(index, action = %step.action(), target = %step.target, ?limit, "executing step");

        let start = Instant::now();
        let dispatched = match limit {
            Some(limit) => {
                let bound = if step.is_fixed_wait() { limit } else { limit + TIMEOUT_GRACE };
                match timeout(bound, self.dispatch(step, limit, page)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(PageError::Timeout(limit.as_millis() as u64)),
                }
            }
            None => self.dispatch(step, Duration::ZERO, page).await,
        };
        let elapsed = start.elapsed();

        let mut fault = None;
        let mut timed_out = false;
        let mut assertion_timed_out = false;
        let mut measurements = StepMeasurements::default();

        let (status, error_detail) = match dispatched {
            Ok(dispatched) => {
                let (m, measurement_fault) = self
                    .measure(step, dispatched.trace_armed, dispatched.style_before, page)
                    .await;
                measurements = m;
                fault = measurement_fault;
                assertion_timed_out = dispatched.assertion_timed_out;
                match dispatched.warning {
                    Some(warning) => (StepStatus::Warning, Some(warning)),
                    None => (StepStatus::Success, None),
                }
            }
            Err(e) => {
                timed_out = matches!(e, PageError::Timeout(_));
                warn!(index, action = %step.action(), target = %step.target, "step failed: {}", e);
                let detail = e.to_string();
                if e.is_fatal() {
                    fault = Some(e);
                }
                (StepStatus::Failure, Some(detail))
            }
        };

        // A timed-out step is reported at its limit, not at limit plus grace
        let duration_ms = match (timed_out, limit) {
            (true, Some(limit)) => elapsed.min(limit).as_millis() as u64,
            _ => elapsed.as_millis() as u64,
        };

        StepExecution {
            result: StepResult {
                step_index: index,
                action: step.action(),
                target: step.target.clone(),
                status,
                duration_ms,
                error_detail,
                timestamp,
                timed_out,
                fixed_wait: step.is_fixed_wait(),
                assertion_timed_out,
                affected_element: step.affected_element().map(String::from),
                measurements,
            },
            fault,
        }
    }

    /// Perform the interaction itself; this is the timed part of a step
    async fn dispatch<P>(&self, step: &Step, limit: Duration, page: &mut P) -> PageResult<Dispatched>
    where
        P: PageHandle + ?Sized,
    {
        let limit_ms = limit.as_millis() as u64;
        let budget = Budget::start(limit);
        let mut dispatched = Dispatched::default();

        match &step.kind {
            StepKind::Navigate { url } => {
                page.navigate(&self.resolve_url(url), limit_ms).await?;
            }
            StepKind::Click { selector } => {
                page.wait_for_selector(selector, limit_ms).await?;
                dispatched.trace_armed = arm_trace(page).await?;
                page.click(selector, budget.remaining_ms()?).await?;
            }
            StepKind::Hover { selector } => {
                page.wait_for_selector(selector, limit_ms).await?;
                dispatched.style_before = gap_or_fatal(page.computed_style(selector).await)?;
                page.hover(selector, budget.remaining_ms()?).await?;
            }
            StepKind::Type { selector, text } => {
                page.wait_for_selector(selector, limit_ms).await?;
                if !page.is_editable(selector, budget.remaining_ms()?).await? {
                    return Err(PageError::NotEditable(selector.clone()));
                }
                dispatched.trace_armed = arm_trace(page).await?;
                page.type_text(selector, text, budget.remaining_ms()?).await?;
            }
            StepKind::Wait(WaitTarget::Selector(selector)) => {
                page.wait_for_selector(selector, limit_ms).await?;
            }
            StepKind::Wait(WaitTarget::Duration(delay)) => {
                tokio::time::sleep(*delay).await;
            }
            StepKind::Assert { selector, expected } => {
                let outcome = self.check_assertion(selector, expected.as_deref(), &budget, page).await?;
                dispatched.assertion_timed_out = outcome.waited_out;
                dispatched.warning = outcome.warning;
            }
        }

        Ok(dispatched)
    }

    /// Assertions never fail a step: mismatches become warnings. Only a fatal
    /// page error escapes.
    async fn check_assertion<P>(
        &self,
        selector: &str,
        expected: Option<&str>,
        budget: &Budget,
        page: &mut P,
    ) -> PageResult<AssertionOutcome>
    where
        P: PageHandle + ?Sized,
    {
        if let Err(e) = page.wait_for_selector(selector, budget.limit_ms()).await {
            if e.is_fatal() {
                return Err(e);
            }
            return Ok(AssertionOutcome {
                warning: Some(format!("Assertion on {} failed: {}", selector, e)),
                waited_out: matches!(e, PageError::Timeout(_)),
            });
        }

        let Some(expected) = expected else {
            return Ok(AssertionOutcome::default());
        };

        let remaining_ms = match budget.remaining_ms() {
            Ok(ms) => ms,
            Err(e) => {
                return Ok(AssertionOutcome {
                    warning: Some(format!("Assertion on {} failed: {}", selector, e)),
                    waited_out: true,
                })
            }
        };

        let warning = match page.text_content(selector, remaining_ms).await {
            Ok(Some(actual)) if actual.trim() == expected.trim() => None,
            Ok(Some(actual)) => Some(format!(
                "Assertion on {} failed: expected '{}', found '{}'",
                selector,
                expected,
                actual.trim()
            )),
            Ok(None) => Some(format!(
                "Assertion on {} failed: element has no text, expected '{}'",
                selector, expected
            )),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => Some(format!("Assertion on {} failed: {}", selector, e)),
        };

        Ok(AssertionOutcome { warning, waited_out: false })
    }

    /// Collect the supplementary signals for the detectors. Anything the page
    /// cannot provide is left as a gap.
    async fn measure<P>(
        &self,
        step: &Step,
        trace_armed: bool,
        style_before: Option<StyleSnapshot>,
        page: &mut P,
    ) -> (StepMeasurements, Option<PageError>)
    where
        P: PageHandle + ?Sized,
    {
        let mut measurements = StepMeasurements::default();
        let mut probe = Probe::new(Duration::from_millis(
            self.config.element_timeout_ms + self.config.feedback_window_ms,
        ));

        if trace_armed {
            if let Some(trace) = probe.run("interaction trace", page.end_trace(self.config.feedback_window_ms)).await {
                match step.kind {
                    StepKind::Click { .. } => measurements.mutations_after_click = Some(trace.mutations),
                    StepKind::Type { .. } => measurements.input_latency_ms = trace.keystroke_latency_ms,
                    _ => {}
                }
                measurements.layout_recalculations = trace.layout_recalculations;
            }
        }

        let interactive = matches!(
            step.kind,
            StepKind::Click { .. } | StepKind::Hover { .. } | StepKind::Type { .. }
        );
        let Some(selector) = step.affected_element().filter(|_| interactive) else {
            return (measurements, probe.fault);
        };

        if let StepKind::Hover { .. } = step.kind {
            if let Some(before) = style_before {
                if let Some(after) = probe.run("computed style", page.computed_style(selector)).await {
                    measurements.hover_style_changed = Some(!before.changed_properties(&after).is_empty());
                }
            }
        }

        measurements.animations = probe.run("animations", page.animations(selector)).await;

        (measurements, probe.fault)
    }
}

/// Time left in a step; every page call after the first shares what the
/// earlier ones did not use
struct Budget {
    limit: Duration,
    deadline: Instant,
}

impl Budget {
    fn start(limit: Duration) -> Self {
        Self {
            limit,
            deadline: Instant::now() + limit,
        }
    }

    fn limit_ms(&self) -> u64 {
        self.limit.as_millis() as u64
    }

    fn remaining_ms(&self) -> PageResult<u64> {
        let left = self.deadline.saturating_duration_since(Instant::now()).as_millis() as u64;
        if left == 0 {
            return Err(PageError::Timeout(self.limit_ms()));
        }
        Ok(left)
    }
}

/// Bounded measurement calls; errors are gaps unless they are fatal
struct Probe {
    limit: Duration,
    fault: Option<PageError>,
}

impl Probe {
    fn new(limit: Duration) -> Self {
        Self { limit, fault: None }
    }

    async fn run<T>(&mut self, what: &str, call: impl Future<Output = PageResult<T>>) -> Option<T> {
        if self.fault.is_some() {
            return None;
        }
        match timeout(self.limit, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) if e.is_fatal() => {
                self.fault = Some(e);
                None
            }
            Ok(Err(e)) => {
                debug!("measurement gap ({}): {}", what, e);
                None
            }
            Err(_) => {
                debug!("measurement gap ({}): timed out", what);
                None
            }
        }
    }
}

/// Start an interaction trace; a trace the page cannot provide is a gap
async fn arm_trace<P>(page: &mut P) -> PageResult<bool>
where
    P: PageHandle + ?Sized,
{
    Ok(gap_or_fatal(page.begin_trace().await)?.is_some())
}

fn gap_or_fatal<T>(result: PageResult<T>) -> PageResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("measurement gap: {}", e);
            Ok(None)
        }
    }
}
