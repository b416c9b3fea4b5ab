//! State reflection from classified events to editor sinks.
//!
//! Reflection is level-triggered: every `TotalResults` payload fully
//! replaces the previous annotation state. The current failing set is
//! modeled as an immutable [`FailureSnapshot`] value; each new payload
//! produces a fresh snapshot, and applying it drives a full clear plus
//! republish against the sink.

mod location;
mod sink;

pub use location::*;
pub use sink::*;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::bus::{EventBus, HandlerError, Subscriber};
use crate::runner::{ClassifiedEvent, EventKind, TotalResults};

/// Status text shown when the last cycle passed.
pub const STATUS_PASSED: &str = "Passed";
/// Status text shown when the last cycle failed.
pub const STATUS_FAILED: &str = "Failed";

/// One published failure annotation, keyed by file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub path: PathBuf,
    pub message: String,
}

/// Immutable snapshot of the currently failing files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSnapshot {
    annotations: Vec<Annotation>,
}

impl FailureSnapshot {
    /// Build the snapshot for one run cycle: one annotation per failed
    /// file, in payload order.
    #[must_use]
    pub fn from_results(results: &TotalResults) -> Self {
        let annotations = results
            .failed_files()
            .map(|file| Annotation {
                path: PathBuf::from(&file.name),
                message: file.message.clone(),
            })
            .collect();
        Self { annotations }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }
}

/// Reflects `TotalResults` into status text and per-file diagnostics.
pub struct StateReflector<S: EditorSink> {
    sink: S,
    current: FailureSnapshot,
}

impl<S: EditorSink> StateReflector<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            current: FailureSnapshot::default(),
        }
    }

    /// The snapshot most recently applied.
    #[must_use]
    pub fn current(&self) -> &FailureSnapshot {
        &self.current
    }

    /// Apply one cycle's results to the sink.
    ///
    /// Sink calls happen in a fixed order on the single consumer timeline,
    /// so no half-applied state is observable: status first, then a full
    /// clear, then one annotation per failed file. A passing cycle also
    /// clears, covering the failed-to-passed transition. Applying the same
    /// payload twice yields the same final state.
    pub async fn apply(&mut self, results: &TotalResults) {
        if results.success {
            self.sink.set_status(STATUS_PASSED, None).await;
            self.sink.clear_annotations().await;
            self.current = FailureSnapshot::default();
            return;
        }

        self.sink
            .set_status(STATUS_FAILED, Some(StatusColor::Red))
            .await;

        let snapshot = FailureSnapshot::from_results(results);
        self.sink.clear_annotations().await;
        for annotation in snapshot.iter() {
            self.sink
                .publish_annotation(
                    &annotation.path,
                    RangeHint::FILE_START,
                    &annotation.message,
                    Severity::Error,
                )
                .await;
        }
        self.current = snapshot;
    }
}

#[async_trait]
impl<S: EditorSink> Subscriber for StateReflector<S> {
    fn name(&self) -> &'static str {
        "state-reflector"
    }

    async fn handle(&mut self, event: &ClassifiedEvent) -> Result<(), HandlerError> {
        // Status only changes on a classified results payload; process
        // exits and faults leave the last known state in place.
        if let ClassifiedEvent::JsonResult(results) = event {
            self.apply(results).await;
        }
        Ok(())
    }
}

/// Forwards log-worthy events to the sink's output channel.
pub struct LogReflector<S: EditorSink> {
    sink: S,
}

impl<S: EditorSink> LogReflector<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S: EditorSink> Subscriber for LogReflector<S> {
    fn name(&self) -> &'static str {
        "log-reflector"
    }

    async fn handle(&mut self, event: &ClassifiedEvent) -> Result<(), HandlerError> {
        match event {
            ClassifiedEvent::LogLine(text) => self.sink.append_log_line(text).await,
            ClassifiedEvent::StderrChunk(bytes) => {
                self.sink
                    .append_log_line(&String::from_utf8_lossy(bytes))
                    .await;
            }
            ClassifiedEvent::NonFatalError(message) => {
                self.sink.append_log_line(message).await;
            }
            ClassifiedEvent::FatalError(message) => {
                self.sink
                    .append_log_line(&format!("Exception raised: {message}"))
                    .await;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Event kinds the log reflector listens for.
pub const LOG_KINDS: [EventKind; 4] = [
    EventKind::LogLine,
    EventKind::StderrChunk,
    EventKind::NonFatalError,
    EventKind::FatalError,
];

/// Wire a state reflector and log reflectors onto a bus.
///
/// The sink is cloned per subscription; implementations share their
/// underlying channel cheaply.
pub fn attach_reflectors<S>(bus: &mut EventBus, sink: &S)
where
    S: EditorSink + Clone + 'static,
{
    bus.subscribe(
        EventKind::JsonResult,
        Box::new(StateReflector::new(sink.clone())),
    );
    for kind in LOG_KINDS {
        bus.subscribe(kind, Box::new(LogReflector::new(sink.clone())));
    }
}
