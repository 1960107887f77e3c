//! Service layer
//!
//! The phase runner and the collaborators it drives: a command executor for
//! shell phases and an artifact transport for the upload phase.
//!
//! Collaborators are trait-based so runs can be tested without side effects.

mod artifacts;
mod execution;
mod shell;

// Re-export traits
pub use artifacts::ArtifactTransport;
pub use shell::CommandExecutor;

// Re-export implementations
pub use artifacts::LoggingTransport;
pub use execution::PhaseRunner;
pub use shell::{CommandOutput, ShellExecutor};
