//! Cluster access layer
//!
//! The orchestrator consumes the cluster control plane through the
//! [`ClusterApi`] trait. Services never talk to `kube` directly, which keeps
//! call ordering testable against the in-memory implementation.
//!
//! Lookups return `Ok(None)` for objects that do not exist. "Not found" is
//! never an error at this layer.

mod kubernetes;
mod memory;

pub use kubernetes::KubeCluster;
pub use memory::{ClusterCall, ClusterOp, InMemoryCluster};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod};
use thiserror::Error;

/// Errors reported by a cluster implementation
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No usable connection to the control plane
    #[error("Cluster unreachable: {0}")]
    Unreachable(String),

    /// An object with the same name is still present
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// The control plane rejected or failed a call
    #[error("Failed to {action} {kind} '{name}': {message}")]
    Request {
        action: &'static str,
        kind: &'static str,
        name: String,
        message: String,
    },
}

impl ClusterError {
    /// Create a request error for a failed call
    pub fn request(
        action: &'static str,
        kind: &'static str,
        name: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Request {
            action,
            kind,
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Cluster operations the orchestrator needs
///
/// Every call is awaited before the next one is issued. Implementations do
/// not retry.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Looks up a namespace by name
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, ClusterError>;

    /// Creates a namespace
    async fn create_namespace(&self, namespace: &Namespace) -> Result<(), ClusterError>;

    /// Looks up a configuration object
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError>;

    /// Creates a configuration object
    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterError>;

    /// Requests deletion of a configuration object
    ///
    /// Returns `false` if there was nothing to delete.
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool, ClusterError>;

    /// Looks up a pod
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ClusterError>;

    /// Creates a pod
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), ClusterError>;

    /// Requests deletion of a pod
    ///
    /// Returns `false` if there was nothing to delete. Deletion is
    /// asynchronous; the pod may remain visible for a while afterwards.
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<bool, ClusterError>;
}
