//! Scenario runs against the scripted page
//!
//! Time is paused so step durations are exact: a 2000 ms click handler is
//! measured as 2000 ms.

mod common;

use std::sync::Arc;
use std::time::Duration;

use craftprobe_engine::capture::{CaptureEvent, CaptureReason};
use craftprobe_engine::{
    Category, EngineConfig, RecordingCapture, ReportStatus, ScenarioDefinition, ScenarioRunner,
    Severity, StepStatus,
};

use common::{shop_page, FakeElement, FakeFactory, FakePage};

fn runner() -> ScenarioRunner {
    ScenarioRunner::new(EngineConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_slow_click_scores_70() {
    let source = r##"
id: checkout
steps:
  - action: navigate
    target: http://shop.test/
  - action: click
    target: "#slow-buy"
  - action: wait
    target: 500ms
"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.scenario_id, "checkout");
    assert_eq!(report.step_results.len(), 3);
    assert!(report.step_results.iter().all(|s| s.status == StepStatus::Success));

    assert_eq!(report.step_results[1].duration_ms, 2000);
    assert_eq!(report.step_results[2].duration_ms, 500);
    assert!(report.step_results[2].fixed_wait);

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.category, Category::Performance);
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.source_step_index, Some(1));
    assert_eq!(finding.affected_element.as_deref(), Some("#slow-buy"));

    assert_eq!(report.overall_score, 70);
    assert_eq!(report.summary.high, 1);
    assert_eq!(report.summary.max_step_duration_ms, 2000);
    assert!(!report.summary.duration_penalty_applied);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_action_never_runs() {
    let source = r##"
id: broken
steps:
  - action: navigate
    target: http://shop.test/
  - action: foo
    target: "#buy"
"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.scenario_id, "broken");
    assert!(report.step_results.is_empty());
    assert_eq!(report.overall_score, 0);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].id, "execution-definition");
    assert_eq!(report.findings[0].source_step_index, Some(1));
    assert!(report.findings[0].message.contains("unknown action 'foo'"));
    assert!(page.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_document_is_a_failed_report() {
    let mut page = shop_page();
    let report = runner().run_source("steps: [unclosed", &mut page).await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.scenario_id, "unnamed-scenario");
    assert_eq!(report.findings[0].category, Category::Execution);
    assert_eq!(report.findings[0].severity, Severity::Critical);
}

#[tokio::test(start_paused = true)]
async fn test_json_source_is_accepted() {
    let source = r##"{"id":"json-run","steps":[{"action":"click","target":"#buy","timeoutMs":1000}]}"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.scenario_id, "json-run");
    assert_eq!(report.overall_score, 100);
}

#[tokio::test(start_paused = true)]
async fn test_browser_crash_fails_run() {
    let source = r##"
id: crash
steps:
  - action: navigate
    target: http://shop.test/
  - action: click
    target: "#boom"
  - action: click
    target: "#buy"
"##;
    let mut page = shop_page().with("#boom", FakeElement::button().crashes());
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.overall_score, 0);
    assert_eq!(report.step_results.len(), 2);
    assert_eq!(report.step_results[1].status, StepStatus::Failure);
    assert!(report.step_results[1]
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("Browser crashed"));

    let ids: Vec<&str> = report.findings.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["execution-fault"]);
    assert!(!page.calls().contains(&"click:#buy".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_failures_abort_run() {
    let source = r##"
id: flaky
steps:
  - { action: click, target: "#missing", timeoutMs: 100 }
  - { action: click, target: "#missing", timeoutMs: 100 }
  - { action: click, target: "#missing", timeoutMs: 100 }
  - { action: click, target: "#buy" }
"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.step_results.len(), 3);
    assert!(report.step_results.iter().all(|s| s.timed_out && s.duration_ms == 100));
    assert_eq!(report.summary.error_count, 3);
    assert_eq!(report.summary.critical, 4);
    assert!(report.findings.iter().any(|f| f.id == "execution-aborted"));
    assert!(!page.calls().contains(&"click:#buy".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_abort_can_be_disabled() {
    let source = r##"
id: flaky
steps:
  - { action: click, target: "#missing", timeoutMs: 100 }
  - { action: click, target: "#missing", timeoutMs: 100 }
  - { action: click, target: "#missing", timeoutMs: 100 }
  - { action: click, target: "#buy" }
"##;
    let mut config = EngineConfig::default();
    config.runner.max_consecutive_failures = 0;

    let mut page = shop_page();
    let report = ScenarioRunner::new(config).run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.step_results.len(), 4);
    assert_eq!(report.step_results[3].status, StepStatus::Success);
    assert_eq!(report.findings_in(Category::Performance).len(), 3);
    assert_eq!(report.overall_score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let runner = runner();
    runner.cancellation_token().cancel();

    let scenario = ScenarioDefinition::from_yaml(
        "id: cancelled\nsteps:\n  - { action: navigate, target: http://shop.test/ }\n",
    )
    .unwrap();
    let mut page = shop_page();
    let report = runner.run(&scenario, &mut page).await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.step_results.is_empty());
    assert_eq!(report.findings[0].id, "execution-cancelled");
    assert!(page.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_is_checked_between_steps() {
    let runner = runner();
    let token = runner.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        token.cancel();
    });

    let scenario = ScenarioDefinition::from_yaml(
        r##"
id: interrupted
steps:
  - { action: click, target: "#slow-buy" }
  - { action: click, target: "#buy" }
"##,
    )
    .unwrap();
    let mut page = shop_page();
    let report = runner.run(&scenario, &mut page).await;

    // The in-flight step finishes; the next one never starts
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.step_results.len(), 1);
    assert_eq!(report.step_results[0].duration_ms, 2000);
    assert_eq!(report.step_results[0].status, StepStatus::Success);

    let ids: Vec<&str> = report.findings.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["performance-step-0", "execution-cancelled"]);
}

#[tokio::test(start_paused = true)]
async fn test_assertion_mismatch_is_warning() {
    let source = r##"
id: greeting
steps:
  - { action: assert, target: "#title", value: Goodbye }
  - { action: assert, target: "#title", value: Welcome }
  - { action: assert, target: "#gone", timeoutMs: 100 }
"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    let statuses: Vec<StepStatus> = report.step_results.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Warning, StepStatus::Success, StepStatus::Warning]
    );
    assert!(report.step_results[0]
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("expected 'Goodbye', found 'Welcome'"));
    assert_eq!(report.summary.warning_count, 2);
    assert_eq!(report.summary.error_count, 0);
    assert_eq!(report.overall_score, 100);
}

#[tokio::test(start_paused = true)]
async fn test_assertion_on_missing_element_is_not_slowness() {
    let source = r##"
id: gone
steps:
  - { action: assert, target: "#gone" }
  - { action: assert, target: "#gone" }
  - { action: assert, target: "#gone" }
"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    for step in &report.step_results {
        assert_eq!(step.status, StepStatus::Warning);
        assert_eq!(step.duration_ms, 5000);
        assert!(step.assertion_timed_out);
    }
    assert!(report.findings.is_empty(), "{:?}", report.findings);
    assert_eq!(report.overall_score, 100);
}

#[tokio::test(start_paused = true)]
async fn test_element_operations_share_the_step_timeout() {
    let source = r##"
id: late-button
steps:
  - { action: click, target: "#late", timeoutMs: 1000 }
  - { action: type, target: "#search", value: shoes }
  - { action: assert, target: "#title", value: Welcome, timeoutMs: 800 }
"##;
    let mut page = shop_page().with("#late", FakeElement::button().appears_after_ms(400));
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(
        page.budgets(),
        vec![
            ("click:#late".to_string(), 600),
            ("editable:#search".to_string(), 5000),
            ("type:#search".to_string(), 5000),
            ("text:#title".to_string(), 800),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_typing_into_text_is_a_step_failure_not_a_finding() {
    let source = r##"
id: typing
steps:
  - { action: type, target: "#title", value: hello }
  - { action: type, target: "#search", value: shoes }
  - { action: assert, target: "#search", value: shoes }
"##;
    let mut page = shop_page();
    let report = runner().run_source(source, &mut page).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.step_results[0].status, StepStatus::Failure);
    assert!(report.step_results[0]
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("not input-capable"));
    assert_eq!(report.step_results[1].status, StepStatus::Success);
    assert_eq!(report.step_results[2].status, StepStatus::Success);
    assert!(report.findings.is_empty());
    assert_eq!(report.overall_score, 100);
}

#[tokio::test(start_paused = true)]
async fn test_craft_bugs_from_measurements() {
    let page = FakePage::new()
        .with("#search", FakeElement::input().keystroke_latency(250.0))
        .with("#menu", FakeElement::button().no_hover_feedback())
        .with("#noop", FakeElement::button().silent())
        .with(
            "#drawer",
            FakeElement::button().animation("slide", 800.0, Some("linear"), &["transform"]),
        );
    let source = r##"
id: polish
steps:
  - { action: type, target: "#search", value: shoes }
  - { action: hover, target: "#menu" }
  - { action: click, target: "#noop" }
  - { action: click, target: "#drawer" }
"##;
    let mut page = page;
    let report = runner().run_source(source, &mut page).await;

    let summary: Vec<(Option<usize>, Category, Severity)> = report
        .findings
        .iter()
        .map(|f| (f.source_step_index, f.category, f.severity))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some(0), Category::Input, Severity::High),
            (Some(1), Category::Feedback, Severity::Low),
            (Some(2), Category::Feedback, Severity::High),
            (Some(3), Category::Motion, Severity::Medium),
        ]
    );
    assert_eq!(report.step_results[0].measurements.input_latency_ms, Some(250.0));
    assert_eq!(report.step_results[1].measurements.hover_style_changed, Some(false));
    assert_eq!(report.step_results[2].measurements.mutations_after_click, Some(0));
    // 100 - 30 - 5 - 30 - 15
    assert_eq!(report.overall_score, 20);
}

#[tokio::test(start_paused = true)]
async fn test_hover_with_feedback_is_clean() {
    let mut page = shop_page();
    let report = runner()
        .run_source("id: hover\nsteps:\n  - { action: hover, target: \"#buy\" }\n", &mut page)
        .await;

    assert_eq!(report.step_results[0].measurements.hover_style_changed, Some(true));
    assert!(report.findings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capture_hook_sees_failures_and_findings() {
    let hook = RecordingCapture::new();
    let runner = runner().with_capture(Arc::new(hook.clone()));
    let source = r##"
id: captured
steps:
  - { action: click, target: "#slow-buy" }
  - { action: click, target: "#missing", timeoutMs: 100 }
"##;
    let mut page = shop_page();
    let report = runner.run_source(source, &mut page).await;
    assert_eq!(report.status, ReportStatus::Completed);

    let events = hook.events();
    assert_eq!(
        events,
        vec![
            CaptureEvent {
                step_index: Some(0),
                reason: CaptureReason::Finding {
                    finding_id: "performance-step-0".to_string(),
                    severity: Severity::High,
                },
            },
            CaptureEvent {
                step_index: Some(1),
                reason: CaptureReason::StepFailure {
                    detail: "Timeout after 100 ms".to_string(),
                },
            },
            CaptureEvent {
                step_index: Some(1),
                reason: CaptureReason::Finding {
                    finding_id: "performance-step-1".to_string(),
                    severity: Severity::Critical,
                },
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_many_keeps_input_order() {
    let scenarios: Vec<ScenarioDefinition> = ["slow", "fast", "broken-selector"]
        .iter()
        .map(|id| {
            let target = match *id {
                "slow" => "#slow-buy",
                "fast" => "#buy",
                _ => "#missing",
            };
            ScenarioDefinition::from_yaml(&format!(
                "id: {}\nsteps:\n  - {{ action: click, target: \"{}\", timeoutMs: 100 }}\n",
                id, target
            ))
            .unwrap()
        })
        .collect();

    // the slow scenario needs its own timeout
    let mut scenarios = scenarios;
    scenarios[0].steps[0].timeout_ms = Some(5000);

    let factory = FakeFactory { template: shop_page() };
    let reports = runner().run_many(&scenarios, &factory).await;

    let ids: Vec<&str> = reports.iter().map(|r| r.scenario_id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "fast", "broken-selector"]);
    assert!(reports.iter().all(|r| r.is_completed()));
    assert_eq!(reports[0].overall_score, 70);
    assert_eq!(reports[1].overall_score, 100);
    assert_eq!(reports[2].overall_score, 50);

    let run_ids: std::collections::HashSet<_> = reports.iter().map(|r| r.run_id).collect();
    assert_eq!(run_ids.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_file_uses_file_stem_as_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("login.yaml");
    std::fs::write(&path, "steps:\n  - { action: click, target: \"#buy\" }\n").unwrap();

    let mut page = shop_page();
    let report = runner().run_file(&path, &mut page).await;
    assert_eq!(report.scenario_id, "login");
    assert!(report.is_completed());

    let missing = dir.path().join("absent.yaml");
    let report = runner().run_file(&missing, &mut page).await;
    assert_eq!(report.scenario_id, "absent");
    assert_eq!(report.status, ReportStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_report_serializes_camel_case() {
    let mut page = shop_page();
    let report = runner()
        .run_source("id: json\nsteps:\n  - { action: click, target: \"#slow-buy\" }\n", &mut page)
        .await;

    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["scenarioId"], "json");
    assert_eq!(json["status"], "completed");
    assert_eq!(json["overallScore"], 70);
    assert_eq!(json["stepResults"][0]["durationMs"], 2000);
    assert_eq!(json["stepResults"][0]["measurements"]["mutationsAfterClick"], 1);
    assert_eq!(json["findings"][0]["sourceStepIndex"], 0);
}
