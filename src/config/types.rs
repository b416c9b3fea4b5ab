//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::runner::DEFAULT_MAX_BUFFER;

/// Watch supervisor configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Runner executable path or name, resolved via `PATH`.
    pub runner: String,
    /// Extra arguments passed through to the runner.
    pub extra_args: Vec<String>,
    /// Working directory for the runner process.
    pub working_dir: Option<PathBuf>,
    /// Explicit runner configuration file.
    pub runner_config: Option<PathBuf>,
    /// Partial-payload buffer limit for the demultiplexer.
    pub max_buffer_bytes: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            runner: "jest".to_string(),
            extra_args: Vec::new(),
            working_dir: None,
            runner_config: None,
            max_buffer_bytes: DEFAULT_MAX_BUFFER,
        }
    }
}
