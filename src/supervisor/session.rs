//! Run session state machine.

/// Lifecycle state of a watch-mode run session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    /// Stopped deliberately by the caller.
    Stopped,
    /// Process ended on its own with a clean exit.
    Exited,
    /// Process ended on its own with a non-zero or unknown exit.
    Crashed,
}

/// One subprocess instance's bookkeeping: lifecycle state plus the
/// accumulated stderr the process has produced so far.
///
/// Owned exclusively by the supervisor; at most one session is alive per
/// supervisor at a time.
#[derive(Debug, Clone, Default)]
pub struct RunSession {
    state: SessionState,
    stderr: Vec<u8>,
    exit_code: Option<i32>,
}

impl RunSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transition(&mut self, new_state: SessionState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "Session transition");
        self.state = new_state;
    }

    /// Append a chunk of subprocess stderr.
    pub fn record_stderr(&mut self, chunk: &[u8]) {
        self.stderr.extend_from_slice(chunk);
    }

    /// The accumulated stderr as lossy UTF-8.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn record_exit(&mut self, code: Option<i32>) {
        self.exit_code = code;
        let state = if code == Some(0) {
            SessionState::Exited
        } else {
            SessionState::Crashed
        };
        self.transition(state);
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}
