//! Output demultiplexer for runner stdout and stderr.
//!
//! Runner stdout interleaves free-form log text with structured JSON result
//! payloads, and the process buffers writes by chunk size rather than by
//! line or message. The demultiplexer reassembles split payloads across
//! chunks and classifies each piece of output into exactly one
//! [`ClassifiedEvent`], or none for whitespace and suppressed banner lines.

use regex::Regex;

use crate::runner::{ClassifiedEvent, TotalResults};

/// Maximum bytes of partial JSON buffered before the run is considered lost.
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// Interactive watch-mode banner text, noise for a non-interactive consumer.
const WATCH_BANNER: &str = "Watch Usage";

/// Stateful classifier over raw stdout chunks.
#[derive(Debug)]
pub struct OutputDemultiplexer {
    buffer: String,
    max_buffer: usize,
    trace_marker: Regex,
}

impl Default for OutputDemultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDemultiplexer {
    /// Create a demultiplexer with the default buffer limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    /// Create a demultiplexer with an explicit buffer limit.
    ///
    /// # Panics
    ///
    /// Panics if the trace-marker pattern fails to compile, which is a
    /// programming error caught by tests.
    #[must_use]
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        let trace_marker = Regex::new(
            r"(?m)^(?:Uncaught exception|Unhandled (?:promise )?rejection)|^\s+at .+ \(.+:\d+:\d+\)",
        )
        .unwrap();
        Self {
            buffer: String::new(),
            max_buffer,
            trace_marker,
        }
    }

    /// Classify one chunk of stdout text.
    ///
    /// Returns at most one event. Partial JSON is held across invocations
    /// and re-parsed on every new chunk until it completes or exceeds the
    /// buffer limit.
    pub fn classify(&mut self, chunk: &str) -> Option<ClassifiedEvent> {
        if self.buffer.is_empty() {
            let trimmed = chunk.trim();
            if trimmed.is_empty() {
                return None;
            }
            if !trimmed.starts_with('{') {
                return self.classify_text(chunk);
            }
        }

        self.buffer.push_str(chunk);

        if self.buffer.len() > self.max_buffer {
            let size = self.buffer.len();
            self.buffer.clear();
            tracing::warn!(size, limit = self.max_buffer, "Result payload oversized");
            return Some(ClassifiedEvent::FatalError(format!(
                "result payload exceeded {} bytes, run lost",
                self.max_buffer
            )));
        }

        match serde_json::from_str::<serde_json::Value>(self.buffer.trim()) {
            Ok(value) => {
                let text = std::mem::take(&mut self.buffer);
                if is_total_results_shape(&value) {
                    match serde_json::from_value::<TotalResults>(value) {
                        Ok(results) => Some(ClassifiedEvent::JsonResult(results)),
                        Err(e) => Some(ClassifiedEvent::NonFatalError(format!(
                            "result payload rejected: {e}"
                        ))),
                    }
                } else {
                    // Complete JSON but not a results payload, treat as text
                    self.classify_text(&text)
                }
            }
            Err(e) if e.is_eof() => {
                // Payload split across chunks, wait for more output
                tracing::trace!(buffered = self.buffer.len(), "Partial payload buffered");
                None
            }
            Err(_) => {
                let text = std::mem::take(&mut self.buffer);
                self.classify_text(&text)
            }
        }
    }

    /// Classify a stderr chunk.
    ///
    /// Stderr content is already diagnostic, so it is forwarded verbatim
    /// without inspection.
    #[must_use]
    pub fn classify_stderr(chunk: &[u8]) -> ClassifiedEvent {
        ClassifiedEvent::StderrChunk(chunk.to_vec())
    }

    /// Discard any buffered partial payload.
    ///
    /// Called on supervisor stop so a half-received payload is never
    /// flushed as a spurious event.
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(discarded = self.buffer.len(), "Partial payload discarded");
            self.buffer.clear();
        }
    }

    /// Returns true if a partial payload is currently buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }

    fn classify_text(&self, text: &str) -> Option<ClassifiedEvent> {
        if self.trace_marker.is_match(text) {
            let headline = text
                .lines()
                .find(|line| !line.trim().is_empty())
                .unwrap_or(text)
                .trim();
            return Some(ClassifiedEvent::FatalError(headline.to_string()));
        }
        if text.contains(WATCH_BANNER) {
            // Interactive banner, suppressed
            return None;
        }
        Some(ClassifiedEvent::LogLine(text.to_string()))
    }
}

/// Check whether a parsed value has the result payload shape.
fn is_total_results_shape(value: &serde_json::Value) -> bool {
    value.get("success").is_some_and(serde_json::Value::is_boolean)
        && value.get("testResults").is_some_and(serde_json::Value::is_array)
}
