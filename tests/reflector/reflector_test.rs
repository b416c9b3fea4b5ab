//! Tests for state reflection against a recording sink.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use testwatch::bus::{EventBus, Subscriber};
use testwatch::reflector::{
    attach_reflectors, EditorSink, LogReflector, RangeHint, Severity, StateReflector, StatusColor,
    STATUS_FAILED, STATUS_PASSED,
};
use testwatch::runner::{ClassifiedEvent, TotalResults};

/// One observed sink call.
#[derive(Debug, Clone, PartialEq)]
enum SinkCall {
    Status(String, Option<StatusColor>),
    Clear,
    Annotation(PathBuf, String, Severity),
    Log(String),
}

/// Editor sink recording every call; clones share the same log.
#[derive(Clone, Default)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self::default()
    }

    fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    fn annotations(&self) -> Vec<SinkCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, SinkCall::Annotation(..)))
            .collect()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl EditorSink for RecordingSink {
    async fn set_status(&mut self, text: &str, color: Option<StatusColor>) {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Status(text.to_string(), color));
    }

    async fn clear_annotations(&mut self) {
        self.calls.lock().unwrap().push(SinkCall::Clear);
    }

    async fn publish_annotation(
        &mut self,
        path: &Path,
        _range: RangeHint,
        message: &str,
        severity: Severity,
    ) {
        self.calls.lock().unwrap().push(SinkCall::Annotation(
            path.to_path_buf(),
            message.to_string(),
            severity,
        ));
    }

    async fn append_log_line(&mut self, text: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Log(text.to_string()));
    }
}

fn parse(json: &str) -> TotalResults {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn passing_run_sets_status_and_clears() {
    let sink = RecordingSink::new();
    let mut reflector = StateReflector::new(sink.clone());

    reflector
        .apply(&parse(r#"{"success":true,"testResults":[]}"#))
        .await;

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Status(STATUS_PASSED.to_string(), None),
            SinkCall::Clear,
        ]
    );
    assert!(reflector.current().is_empty());
}

#[tokio::test]
async fn failing_run_publishes_one_annotation_per_failed_file() {
    let sink = RecordingSink::new();
    let mut reflector = StateReflector::new(sink.clone());

    reflector
        .apply(&parse(
            r#"{"success":false,"testResults":[
                {"name":"a.test.js","status":"failed","message":"boom"},
                {"name":"b.test.js","status":"passed","message":""},
                {"name":"c.test.js","status":"failed","message":"bang"}
            ]}"#,
        ))
        .await;

    let calls = sink.calls();
    assert_eq!(
        calls[0],
        SinkCall::Status(STATUS_FAILED.to_string(), Some(StatusColor::Red))
    );
    assert_eq!(calls[1], SinkCall::Clear);
    assert_eq!(
        sink.annotations(),
        vec![
            SinkCall::Annotation(PathBuf::from("a.test.js"), "boom".to_string(), Severity::Error),
            SinkCall::Annotation(PathBuf::from("c.test.js"), "bang".to_string(), Severity::Error),
        ]
    );
    assert_eq!(reflector.current().len(), 2);
}

#[tokio::test]
async fn scenario_single_failure() {
    let sink = RecordingSink::new();
    let mut reflector = StateReflector::new(sink.clone());

    reflector
        .apply(&parse(
            r#"{"success":false,"testResults":[{"name":"a.test.js","status":"failed","message":"boom"}]}"#,
        ))
        .await;

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Status(STATUS_FAILED.to_string(), Some(StatusColor::Red)),
            SinkCall::Clear,
            SinkCall::Annotation(PathBuf::from("a.test.js"), "boom".to_string(), Severity::Error),
        ]
    );
}

#[tokio::test]
async fn failed_to_passed_transition_clears_stale_annotations() {
    let sink = RecordingSink::new();
    let mut reflector = StateReflector::new(sink.clone());

    reflector
        .apply(&parse(
            r#"{"success":false,"testResults":[{"name":"a.test.js","status":"failed","message":"boom"}]}"#,
        ))
        .await;
    assert_eq!(reflector.current().len(), 1);

    sink.clear();
    reflector
        .apply(&parse(r#"{"success":true,"testResults":[]}"#))
        .await;

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Status(STATUS_PASSED.to_string(), None),
            SinkCall::Clear,
        ]
    );
    assert!(reflector.current().is_empty());
}

#[tokio::test]
async fn applying_same_results_twice_is_idempotent() {
    let payload = parse(
        r#"{"success":false,"testResults":[{"name":"a.test.js","status":"failed","message":"boom"}]}"#,
    );

    let sink = RecordingSink::new();
    let mut reflector = StateReflector::new(sink.clone());

    reflector.apply(&payload).await;
    let first_calls = sink.calls();
    let first_snapshot = reflector.current().clone();

    sink.clear();
    reflector.apply(&payload).await;

    assert_eq!(sink.calls(), first_calls);
    assert_eq!(*reflector.current(), first_snapshot);
}

#[tokio::test]
async fn process_exit_leaves_status_untouched() {
    let sink = RecordingSink::new();
    let mut reflector = StateReflector::new(sink.clone());

    reflector
        .handle(&ClassifiedEvent::ProcessExited(Some(1)))
        .await
        .unwrap();

    assert!(sink.calls().is_empty(), "no automatic Failed assumption");
}

#[tokio::test]
async fn log_reflector_forwards_output() {
    let sink = RecordingSink::new();
    let mut reflector = LogReflector::new(sink.clone());

    reflector
        .handle(&ClassifiedEvent::LogLine("ran 3 suites".to_string()))
        .await
        .unwrap();
    reflector
        .handle(&ClassifiedEvent::StderrChunk(b"warning: slow test".to_vec()))
        .await
        .unwrap();
    reflector
        .handle(&ClassifiedEvent::FatalError("TypeError".to_string()))
        .await
        .unwrap();

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Log("ran 3 suites".to_string()),
            SinkCall::Log("warning: slow test".to_string()),
            SinkCall::Log("Exception raised: TypeError".to_string()),
        ]
    );
}

#[tokio::test]
async fn attached_reflectors_cover_status_and_log() {
    let sink = RecordingSink::new();
    let mut bus = EventBus::new();
    attach_reflectors(&mut bus, &sink);

    bus.emit(&ClassifiedEvent::JsonResult(parse(
        r#"{"success":true,"testResults":[]}"#,
    )))
    .await;
    bus.emit(&ClassifiedEvent::LogLine("tail".to_string())).await;

    let calls = sink.calls();
    assert!(calls.contains(&SinkCall::Status(STATUS_PASSED.to_string(), None)));
    assert!(calls.contains(&SinkCall::Log("tail".to_string())));
}
