//! Phase execution
//!
//! Loads the phase document and runs Build, Artifacts and Finalize in order.
//! The first failure ends the run.

use scicd_core::domain::pipeline::{ArtifactsPhase, Phases};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{ArtifactTransport, CommandExecutor, CommandOutput};
use crate::error::PhaseError;
use crate::phase::{Phase, RunState};
use crate::report::RunReport;

/// Reads the phase document from `path`
///
/// A file that cannot be read and a file that does not parse are reported
/// as different errors.
pub fn load_phases(path: &Path) -> Result<Phases, PhaseError> {
    let source = std::fs::read_to_string(path).map_err(|source| PhaseError::ConfigMissing {
        path: path.to_path_buf(),
        source,
    })?;

    Phases::from_json(&source).map_err(|source| PhaseError::ConfigMalformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs a phase document to completion
pub struct PhaseRunner {
    executor: Arc<dyn CommandExecutor>,
    transport: Arc<dyn ArtifactTransport>,
}

impl PhaseRunner {
    /// Creates a runner from its collaborators
    pub fn new(executor: Arc<dyn CommandExecutor>, transport: Arc<dyn ArtifactTransport>) -> Self {
        Self {
            executor,
            transport,
        }
    }

    /// Loads the phase document at `config_path` and runs it
    pub async fn run(&self, config_path: &Path) -> Result<RunReport, PhaseError> {
        info!("Reading phases from {}", config_path.display());
        let phases = load_phases(config_path)?;
        debug!("Loaded phases: {:?}", phases);

        self.run_phases(&phases).await
    }

    /// Runs every phase in order, stopping at the first failure
    pub async fn run_phases(&self, phases: &Phases) -> Result<RunReport, PhaseError> {
        let mut report = RunReport::new();
        let mut state = RunState::start();

        while let RunState::Pending(phase) = state {
            info!("Starting execution in Phase: {}", phase);

            let executed = self.execute_phase(phase, phases).await?;
            report.record_phase(phase, executed);

            info!("Phase {} completed", phase);
            state = state.advance();
        }

        report.finish();
        info!("All phases executed successfully");
        Ok(report)
    }

    /// Executes one phase; returns the number of commands it ran
    async fn execute_phase(&self, phase: Phase, phases: &Phases) -> Result<usize, PhaseError> {
        match phase {
            Phase::Build => self.run_commands(phase, &phases.build).await,
            Phase::Artifacts => {
                self.upload_artifacts(&phases.artifacts).await?;
                Ok(0)
            }
            Phase::Finalize => self.run_commands(phase, &phases.finalize).await,
        }
    }

    async fn run_commands(&self, phase: Phase, commands: &[String]) -> Result<usize, PhaseError> {
        if commands.is_empty() {
            info!("Phase {} has no commands", phase);
            return Ok(0);
        }

        for (index, command) in commands.iter().enumerate() {
            info!(
                "Execution Command [{}/{}]: {}",
                index + 1,
                commands.len(),
                command
            );

            let output = match self.executor.execute(command).await {
                Ok(output) => output,
                Err(source) => {
                    return Err(PhaseError::Spawn {
                        phase,
                        index,
                        command: command.clone(),
                        source,
                    });
                }
            };

            log_output(&output);

            if !output.success() {
                error!(
                    "Command `{}` in phase {} failed with exit code {:?}",
                    command, phase, output.exit_code
                );
                return Err(PhaseError::CommandFailed {
                    phase,
                    index,
                    command: command.clone(),
                    exit_code: output.exit_code,
                    output: output.combined(),
                });
            }
        }

        Ok(commands.len())
    }

    async fn upload_artifacts(&self, artifacts: &ArtifactsPhase) -> Result<(), PhaseError> {
        self.transport
            .upload(&artifacts.local_target_dir, &artifacts.remote_target_dir)
            .await
            .map_err(|e| PhaseError::Artifacts {
                local_dir: artifacts.local_target_dir.clone(),
                remote_dir: artifacts.remote_target_dir.clone(),
                message: format!("{:#}", e),
            })
    }
}

/// Logs each line of a command's captured output
fn log_output(output: &CommandOutput) {
    for line in output.combined().lines() {
        info!("  | {}", line);
    }
}
