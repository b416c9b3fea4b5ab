//! Watch supervisor orchestrating the runner process and event dispatch.
//!
//! The supervisor owns the subprocess lifecycle: it spawns the runner in
//! watch mode, pumps its stdout through the demultiplexer and its stderr
//! verbatim into a single event channel, and drains that channel onto the
//! bus in emission order. The runner is expected to stay resident between
//! file-save triggers, so no idle timeout is imposed.

use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver};
use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::config::WatchConfig;
use crate::runner::{
    pump_stderr, pump_stdout, ClassifiedEvent, OutputDemultiplexer, RunnerProcess,
    RunnerProcessBuilder, SpawnError, DEFAULT_CHANNEL_BUFFER,
};
use crate::supervisor::{RunSession, SessionState};

/// Default timeout for graceful process termination.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// The runner could not be spawned.
    #[error("Failed to spawn test runner: {0}")]
    Spawn(#[from] SpawnError),
    /// Process stdout was not available.
    #[error("Process stdout not available")]
    NoStdout,
    /// Process stderr was not available.
    #[error("Process stderr not available")]
    NoStderr,
    /// `start` was called while a session is already alive.
    #[error("A run session is already alive")]
    AlreadyRunning,
    /// `run` was called before `start`.
    #[error("Supervisor not started")]
    NotStarted,
    /// Failed to terminate the process.
    #[error("Failed to terminate process: {0}")]
    Terminate(#[from] std::io::Error),
}

/// How a supervised watch session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Stopped deliberately via [`WatchSupervisor::stop`] or the
    /// cancellation token.
    Stopped,
    /// The runner process ended on its own.
    Exited(Option<i32>),
    /// A debugger-wrapped session finished.
    DebuggerComplete,
}

/// Supervisor for a single watch-mode runner process.
///
/// At most one run session is alive per supervisor. Restart policy is the
/// caller's: a process exit is surfaced as an event and an outcome, never
/// retried here.
pub struct WatchSupervisor {
    binary: String,
    builder: RunnerProcessBuilder,
    max_buffer: usize,
    debug_session: bool,
    process: Option<RunnerProcess>,
    event_rx: Option<Receiver<ClassifiedEvent>>,
    session: RunSession,
    cancel: CancellationToken,
}

impl WatchSupervisor {
    /// Create a supervisor for the given runner binary.
    #[must_use]
    pub fn new(binary: impl Into<String>, builder: RunnerProcessBuilder) -> Self {
        Self {
            binary: binary.into(),
            builder,
            max_buffer: crate::runner::DEFAULT_MAX_BUFFER,
            debug_session: false,
            process: None,
            event_rx: None,
            session: RunSession::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a supervisor from loaded configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        let mut builder = RunnerProcessBuilder::new().extra_args(config.extra_args.clone());
        if let Some(ref dir) = config.working_dir {
            builder = builder.working_dir(dir);
        }
        if let Some(ref path) = config.runner_config {
            builder = builder.runner_config(path);
        }
        Self::new(&config.runner, builder).with_max_buffer(config.max_buffer_bytes)
    }

    /// Override the demultiplexer's partial-payload buffer limit.
    #[must_use]
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Mark this session as running under a debugger wrapper.
    ///
    /// A debugger-wrapped session that ends is reported as
    /// [`ClassifiedEvent::DebuggerComplete`] instead of a process exit.
    #[must_use]
    pub fn with_debug_session(mut self, debug_session: bool) -> Self {
        self.debug_session = debug_session;
        self
    }

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Stderr accumulated by the current session.
    #[must_use]
    pub fn session_stderr(&self) -> String {
        self.session.stderr_text()
    }

    /// A token that cancels the running session when triggered.
    ///
    /// Clone this before calling [`run`](Self::run) to stop the supervisor
    /// from another task.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Launch the runner and wire its output streams into the event
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::AlreadyRunning` if a session is alive,
    /// `Spawn` if the process cannot be started, or `NoStdout`/`NoStderr`
    /// if the pipes are unavailable.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if self.process.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let mut process = RunnerProcess::spawn(&self.binary, &self.builder)?;
        let stdout = process.take_stdout().ok_or(SupervisorError::NoStdout)?;
        let stderr = process.take_stderr().ok_or(SupervisorError::NoStderr)?;

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        self.cancel = CancellationToken::new();

        let demux = OutputDemultiplexer::with_max_buffer(self.max_buffer);
        tokio::spawn(pump_stdout(
            stdout,
            tx.clone(),
            demux,
            self.cancel.child_token(),
        ));
        tokio::spawn(pump_stderr(stderr, tx, self.cancel.child_token()));

        tracing::info!(binary = %self.binary, pid = ?process.id(), "Runner started in watch mode");

        self.process = Some(process);
        self.event_rx = Some(rx);
        self.session = RunSession::new();
        self.session.transition(SessionState::Running);
        Ok(())
    }

    /// Drain classified events onto the bus until the session ends.
    ///
    /// Events reach the bus in the order the subprocess emitted them.
    /// Channel closure means both output pumps finished, which in turn
    /// means the process ended; that is reported as exactly one
    /// `ProcessExited` (or `DebuggerComplete`) event.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::NotStarted` if [`start`](Self::start) was
    /// not called, or `Terminate` if the process cannot be torn down on
    /// cancellation.
    pub async fn run(&mut self, bus: &mut EventBus) -> Result<WatchOutcome, SupervisorError> {
        let mut rx = self.event_rx.take().ok_or(SupervisorError::NotStarted)?;
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!("Session stopped via token");
                    self.terminate_process().await?;
                    self.session.transition(SessionState::Stopped);
                    return Ok(WatchOutcome::Stopped);
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        return Ok(self.finish_session(bus).await);
                    };
                    self.observe(&event);
                    bus.emit(&event).await;
                }
            }
        }
    }

    /// Stop the session outside of a [`run`](Self::run) loop.
    ///
    /// Cancels the output pumps (discarding any buffered partial payload)
    /// and tears down the process.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Terminate` if the process cannot be
    /// terminated.
    pub async fn stop(&mut self) -> Result<(), SupervisorError> {
        self.cancel.cancel();
        self.terminate_process().await?;
        self.event_rx = None;
        if self.session.state() == SessionState::Running {
            self.session.transition(SessionState::Stopped);
        }
        Ok(())
    }

    /// Bookkeeping applied to every event before it reaches the bus.
    fn observe(&mut self, event: &ClassifiedEvent) {
        match event {
            ClassifiedEvent::StderrChunk(bytes) => self.session.record_stderr(bytes),
            ClassifiedEvent::FatalError(message) => {
                tracing::warn!(%message, "Fatal output from runner, run lost");
            }
            _ => {}
        }
    }

    /// Handle channel closure: reap the process and emit the terminal
    /// event.
    async fn finish_session(&mut self, bus: &mut EventBus) -> WatchOutcome {
        let code = self.reap().await;
        self.session.record_exit(code);

        if self.debug_session {
            bus.emit(&ClassifiedEvent::DebuggerComplete).await;
            return WatchOutcome::DebuggerComplete;
        }

        tracing::info!(?code, "Runner process exited");
        bus.emit(&ClassifiedEvent::ProcessExited(code)).await;
        WatchOutcome::Exited(code)
    }

    /// Collect the exit status of a process whose streams have closed.
    async fn reap(&mut self) -> Option<i32> {
        let mut process = self.process.take()?;
        match tokio::time::timeout(DEFAULT_TERMINATE_TIMEOUT, process.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to collect runner exit status");
                None
            }
            Err(_) => {
                // Streams closed but the process lingers; force it down
                let _ = process.kill().await;
                None
            }
        }
    }

    async fn terminate_process(&mut self) -> Result<(), SupervisorError> {
        if let Some(mut process) = self.process.take() {
            process.graceful_terminate(DEFAULT_TERMINATE_TIMEOUT).await?;
        }
        Ok(())
    }
}
