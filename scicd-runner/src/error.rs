//! Error types for the runner

use std::path::PathBuf;
use thiserror::Error;

use crate::phase::Phase;

/// Errors that abort a run
///
/// There is no partial success: the first error ends the run and is the
/// only thing reported.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Configuration file is absent or unreadable
    #[error("Configuration file {path} could not be read: {source}")]
    ConfigMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file does not match the phase schema
    #[error("Configuration file {path} is malformed: {source}")]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The shell could not be started for a command
    #[error("Phase {phase}: command #{} `{command}` could not be started: {source}", .index + 1)]
    Spawn {
        phase: Phase,
        index: usize,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A command exited unsuccessfully
    #[error(
        "Phase {phase}: command #{} `{command}` failed ({}){}",
        .index + 1,
        describe_exit(.exit_code),
        describe_output(.output)
    )]
    CommandFailed {
        phase: Phase,
        /// Zero-based position of the command within its phase
        index: usize,
        command: String,
        /// `None` when terminated by a signal
        exit_code: Option<i32>,
        /// Captured stdout followed by stderr
        output: String,
    },

    /// The artifact transport failed
    #[error("Phase Artifacts: upload from {local_dir} to {remote_dir} failed: {message}")]
    Artifacts {
        local_dir: String,
        remote_dir: String,
        message: String,
    },
}

/// Captured output on its own lines, nothing when there was none
fn describe_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{}", output)
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl PhaseError {
    /// Process exit code for this error
    ///
    /// Missing and malformed configuration get their own codes so they can
    /// be told apart from build failures in the pod status.
    pub fn exit_code(&self) -> u8 {
        match self {
            PhaseError::ConfigMissing { .. } => 2,
            PhaseError::ConfigMalformed { .. } => 3,
            _ => 1,
        }
    }

    /// The phase that failed, if execution had started
    pub fn phase(&self) -> Option<Phase> {
        match self {
            PhaseError::Spawn { phase, .. } | PhaseError::CommandFailed { phase, .. } => {
                Some(*phase)
            }
            PhaseError::Artifacts { .. } => Some(Phase::Artifacts),
            PhaseError::ConfigMissing { .. } | PhaseError::ConfigMalformed { .. } => None,
        }
    }
}
