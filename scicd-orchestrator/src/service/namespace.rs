//! Namespace Service
//!
//! Lookup-or-create for the build namespace.

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::managed_labels;
use crate::cluster::ClusterApi;
use crate::error::Result;

/// Ensure the namespace exists
///
/// An existing namespace is left untouched. A create that loses a race with
/// another writer is treated as success once a second lookup finds it.
pub async fn ensure_namespace(cluster: &dyn ClusterApi, namespace: &str) -> Result<()> {
    if cluster.get_namespace(namespace).await?.is_some() {
        tracing::debug!("Namespace {} already exists", namespace);
        return Ok(());
    }

    let object = Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            labels: Some(managed_labels()),
            ..Default::default()
        },
        ..Default::default()
    };

    match cluster.create_namespace(&object).await {
        Ok(()) => {
            tracing::info!("Namespace {} created", namespace);
            Ok(())
        }
        Err(err) => {
            if cluster.get_namespace(namespace).await?.is_some() {
                tracing::info!("Namespace {} was created concurrently", namespace);
                return Ok(());
            }
            Err(err.into())
        }
    }
}
