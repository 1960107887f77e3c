//! SciCD Runner
//!
//! Runs inside the build pod. Reads the phase document mounted from the
//! configuration object and executes it:
//! - Build: shell commands, in order
//! - Artifacts: uploads the local target directory
//! - Finalize: shell commands, in order
//!
//! The first failure ends the run with a non-zero exit code, which is how
//! the outcome shows up in the pod status:
//! - 0: every phase succeeded
//! - 1: a phase failed
//! - 2: phase document missing or unreadable
//! - 3: phase document malformed

mod config;
mod error;
mod phase;
mod report;
mod service;

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::service::{LoggingTransport, PhaseRunner, ShellExecutor};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scicd_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SciCD Runner");

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:#}", e);
        return ExitCode::FAILURE;
    }
    info!(
        "Loaded configuration: config_path={}, shell={}",
        config.config_path.display(),
        config.shell
    );

    let executor = ShellExecutor::new(config.shell.clone()).with_working_dir(config.working_dir);
    let runner = PhaseRunner::new(Arc::new(executor), Arc::new(LoggingTransport::new()));

    match runner.run(&config.config_path).await {
        Ok(report) => {
            info!(
                "Run finished: {} phase(s), {} command(s) in {}ms",
                report.phases_completed.len(),
                report.commands_executed,
                report
                    .duration()
                    .map(|d| d.num_milliseconds())
                    .unwrap_or_default()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.phase() {
                Some(phase) => error!("Run failed in phase {}: {}", phase, e),
                None => error!("Run failed before any phase started: {}", e),
            }
            ExitCode::from(e.exit_code())
        }
    }
}
