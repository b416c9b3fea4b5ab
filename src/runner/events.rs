//! Typed events classified from test runner output.
//!
//! This module defines the result payload the runner emits at the end of
//! each watch cycle, and the closed union of events the demultiplexer and
//! supervisor produce from the raw output streams.

use serde::{Deserialize, Serialize};

/// Outcome of a single test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

/// One source file's outcome within a run cycle.
///
/// Immutable once constructed from a parsed payload. `name` is the file
/// path as reported by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFileResult {
    /// Path of the test file.
    pub name: String,
    /// One-line summary text.
    #[serde(default)]
    pub summary: String,
    /// Failure message, empty when the file passed.
    #[serde(default)]
    pub message: String,
    /// Pass/fail status.
    pub status: TestStatus,
    /// Run start, milliseconds since epoch.
    #[serde(default)]
    pub start_time: f64,
    /// Run end, milliseconds since epoch.
    #[serde(default)]
    pub end_time: f64,
}

/// Aggregate outcome of one watch cycle.
///
/// Produced once per completed run; each new payload supersedes the
/// previous one, they are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalResults {
    /// Overall success flag for the cycle.
    pub success: bool,
    /// Cycle start, milliseconds since epoch.
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub num_total_tests: u32,
    #[serde(default)]
    pub num_total_test_suites: u32,
    #[serde(default)]
    pub num_runtime_error_test_suites: u32,
    #[serde(default)]
    pub num_passed_tests: u32,
    #[serde(default)]
    pub num_failed_tests: u32,
    #[serde(default)]
    pub num_pending_tests: u32,
    /// Per-file outcomes, in runner order.
    #[serde(default)]
    pub test_results: Vec<TestFileResult>,
}

impl TotalResults {
    /// Iterate over the failed files in this cycle.
    pub fn failed_files(&self) -> impl Iterator<Item = &TestFileResult> {
        self.test_results
            .iter()
            .filter(|file| file.status == TestStatus::Failed)
    }
}

/// Discriminant of a [`ClassifiedEvent`], used for bus subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    JsonResult,
    LogLine,
    StderrChunk,
    NonFatalError,
    FatalError,
    ProcessExited,
    DebuggerComplete,
}

/// A classified piece of runner output or lifecycle notification.
///
/// Transient: emitted once on the bus and consumed immediately by
/// subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    /// A fully reassembled structured result payload.
    JsonResult(TotalResults),
    /// Human-readable stdout text.
    LogLine(String),
    /// Raw stderr bytes, forwarded verbatim.
    StderrChunk(Vec<u8>),
    /// A recoverable fault; the run continues.
    NonFatalError(String),
    /// A run-ending fault (uncaught exception, oversized payload).
    FatalError(String),
    /// The runner process ended, with its exit code when known.
    ProcessExited(Option<i32>),
    /// A debugger-wrapped session finished.
    DebuggerComplete,
}

impl ClassifiedEvent {
    /// The kind this event is dispatched under.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::JsonResult(_) => EventKind::JsonResult,
            Self::LogLine(_) => EventKind::LogLine,
            Self::StderrChunk(_) => EventKind::StderrChunk,
            Self::NonFatalError(_) => EventKind::NonFatalError,
            Self::FatalError(_) => EventKind::FatalError,
            Self::ProcessExited(_) => EventKind::ProcessExited,
            Self::DebuggerComplete => EventKind::DebuggerComplete,
        }
    }

    /// Returns the result payload if this is a `JsonResult` event.
    #[must_use]
    pub fn results(&self) -> Option<&TotalResults> {
        match self {
            Self::JsonResult(results) => Some(results),
            _ => None,
        }
    }

    /// Returns true if this event ends the current run.
    #[must_use]
    pub fn is_run_ending(&self) -> bool {
        matches!(self, Self::FatalError(_) | Self::ProcessExited(_))
    }
}
