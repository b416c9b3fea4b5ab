//! Editor sink interface.
//!
//! The host editor's status bar, problem list, and output channel are
//! treated as pure asynchronous sinks behind this trait. The crate ships a
//! terminal implementation in [`crate::display`]; editor hosts provide
//! their own.

use std::path::Path;

use async_trait::async_trait;

use crate::reflector::RangeHint;

/// Annotation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

/// Optional color hint for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Red,
    Green,
}

/// Consumer sink interface produced by the core, consumed by the host.
#[async_trait]
pub trait EditorSink: Send {
    /// Set the single-line status summary.
    async fn set_status(&mut self, text: &str, color: Option<StatusColor>);

    /// Remove all previously published annotations.
    async fn clear_annotations(&mut self);

    /// Publish one annotation keyed by file path.
    async fn publish_annotation(
        &mut self,
        path: &Path,
        range: RangeHint,
        message: &str,
        severity: Severity,
    );

    /// Append a line to the host's log/output channel.
    async fn append_log_line(&mut self, text: &str);
}
