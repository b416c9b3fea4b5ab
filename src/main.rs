//! Testwatch - watch-mode test runner supervision from the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use testwatch::bus::EventBus;
use testwatch::config::{ConfigLoader, WatchConfig};
use testwatch::display::TerminalSink;
use testwatch::reflector::attach_reflectors;
use testwatch::supervisor::{WatchOutcome, WatchSupervisor};

#[derive(Parser)]
#[command(
    name = "testwatch",
    about = "Watch-mode test runner supervisor with editor state reflection",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a testwatch config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise the test runner in watch mode.
    Run {
        /// Runner executable (overrides config).
        #[arg(long)]
        runner: Option<String>,
        /// Working directory for the runner.
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Runner configuration file passed through to the runner.
        #[arg(long)]
        runner_config: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<WatchConfig> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(mut config) = load_config(cli.config) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Commands::Run {
            runner,
            cwd,
            runner_config,
        } => {
            if let Some(runner) = runner {
                config.runner = runner;
            }
            if let Some(cwd) = cwd {
                config.working_dir = Some(cwd);
            }
            if let Some(path) = runner_config {
                config.runner_config = Some(path);
            }
            run(&config).await
        }
    }
}

async fn run(config: &WatchConfig) -> ExitCode {
    let mut supervisor = WatchSupervisor::from_config(config);
    if let Err(e) = supervisor.start() {
        tracing::error!(error = %e, runner = %config.runner, "Failed to start runner");
        return ExitCode::FAILURE;
    }

    let mut bus = EventBus::new();
    attach_reflectors(&mut bus, &TerminalSink::new());

    // Ctrl-C stops the session; the runner otherwise stays resident
    let cancel = supervisor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match supervisor.run(&mut bus).await {
        Ok(WatchOutcome::Stopped) => ExitCode::SUCCESS,
        Ok(WatchOutcome::DebuggerComplete) => {
            tracing::info!("Debugger session complete");
            ExitCode::SUCCESS
        }
        Ok(WatchOutcome::Exited(code)) => {
            tracing::warn!(?code, "Runner exited unexpectedly");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Supervisor failed");
            ExitCode::FAILURE
        }
    }
}
