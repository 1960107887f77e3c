//! Error types for the orchestrator

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cluster::ClusterError;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Errors that can occur while launching a build
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Descriptor file could not be read
    #[error("Failed to read pipeline descriptor {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor file is not a valid pipeline descriptor
    #[error("Malformed pipeline descriptor {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A resource limit is not a valid cluster quantity
    #[error("Invalid {resource} quantity '{value}': {reason}")]
    InvalidQuantity {
        /// Which limit ("cpu" or "memory")
        resource: &'static str,
        value: String,
        reason: String,
    },

    /// Build name or namespace cannot be used as an object name
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// Phase document could not be serialized
    #[error("Failed to serialize phases: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The cluster rejected or failed a call
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// A deleted object was still present when the settle timeout elapsed
    #[error("{kind} '{name}' still present after waiting {waited:?} for deletion")]
    SettleTimeout {
        kind: &'static str,
        name: String,
        waited: Duration,
    },
}

impl OrchestrationError {
    /// Check if this error was raised before any cluster call could happen
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::DescriptorRead { .. }
                | Self::DescriptorParse { .. }
                | Self::InvalidQuantity { .. }
                | Self::InvalidName { .. }
        )
    }
}
