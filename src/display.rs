//! Colored terminal implementation of the editor sink.
//!
//! Used by the CLI so the supervisor can run standalone: status changes,
//! failure annotations, and runner log output are printed to the terminal
//! instead of an editor surface.

use std::io::{self, Write};
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use owo_colors::OwoColorize;

use crate::reflector::{
    to_display_position, EditorSink, RangeHint, Severity, StatusColor,
};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 200;

/// Truncate a string to a maximum byte length, adding ellipsis if
/// truncated. The cut always lands on a character boundary so multibyte
/// content (Jest output routinely contains `✕`/`●`) never panics.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let mut cut = max_len - 3;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}

/// Terminal sink printing to stdout.
///
/// Cheap to clone; every clone writes to the same terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSink;

impl TerminalSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EditorSink for TerminalSink {
    async fn set_status(&mut self, text: &str, color: Option<StatusColor>) {
        let label = "[STATUS]".bold().to_string();
        let status = match color {
            Some(StatusColor::Red) => text.red().bold().to_string(),
            Some(StatusColor::Green) => text.green().bold().to_string(),
            None => text.green().to_string(),
        };
        println!("{} {label} {status}", timestamp().dimmed());
        let _ = io::stdout().flush();
    }

    async fn clear_annotations(&mut self) {
        tracing::debug!("Annotations cleared");
    }

    async fn publish_annotation(
        &mut self,
        path: &Path,
        range: RangeHint,
        message: &str,
        severity: Severity,
    ) {
        let pos = to_display_position(range.start);
        let label = match severity {
            Severity::Error => "[FAIL]".red().bold().to_string(),
            Severity::Warning => "[WARN]".yellow().bold().to_string(),
            Severity::Information => "[INFO]".blue().bold().to_string(),
        };
        println!(
            "{} {label} {}:{}:{} {}",
            timestamp().dimmed(),
            path.display().to_string().cyan(),
            pos.line,
            pos.column,
            truncate(message, DEFAULT_MAX_LEN)
        );
        let _ = io::stdout().flush();
    }

    async fn append_log_line(&mut self, text: &str) {
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            println!("{} {}", timestamp().dimmed(), line.dimmed());
        }
        let _ = io::stdout().flush();
    }
}
