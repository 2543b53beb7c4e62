//! Screenshot/video capture hooks
//!
//! The engine only announces *when* evidence should be captured; storing
//! screenshots or recordings is up to the hook implementation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::report::{Finding, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureReason {
    /// A step ended with `status: failure`
    StepFailure { detail: String },

    /// A detector or the pattern analyzer emitted a finding
    #[serde(rename_all = "camelCase")]
    Finding { finding_id: String, severity: Severity },
}

impl CaptureReason {
    pub fn for_finding(finding: &Finding) -> Self {
        CaptureReason::Finding {
            finding_id: finding.id.clone(),
            severity: finding.severity,
        }
    }
}

/// Receives capture requests. Implementations must not fail the run, so the
/// method has no error channel.
#[async_trait]
pub trait CaptureHook: Send + Sync {
    async fn capture(&self, step_index: Option<usize>, reason: &CaptureReason);
}

/// Ignores every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCapture;

#[async_trait]
impl CaptureHook for NoopCapture {
    async fn capture(&self, step_index: Option<usize>, reason: &CaptureReason) {
        debug!(?step_index, ?reason, "capture requested (no-op hook)");
    }
}

/// A capture request as recorded by [`RecordingCapture`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureEvent {
    pub step_index: Option<usize>,
    pub reason: CaptureReason,
}

/// Keeps every request in memory; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingCapture {
    events: Arc<Mutex<Vec<CaptureEvent>>>,
}

impl RecordingCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CaptureEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<CaptureEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

#[async_trait]
impl CaptureHook for RecordingCapture {
    async fn capture(&self, step_index: Option<usize>, reason: &CaptureReason) {
        self.events.lock().push(CaptureEvent {
            step_index,
            reason: reason.clone(),
        });
    }
}
