//! Configuration Service
//!
//! Publishes the phase document as a single-key configuration object named
//! after the build. Existing objects are replaced, never updated in place.

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use scicd_core::contract::CONFIG_FILE_KEY;
use scicd_core::domain::pipeline::Phases;
use std::collections::BTreeMap;

use super::build_labels;
use crate::cluster::ClusterApi;
use crate::error::Result;
use crate::settle::{SettlePolicy, wait_until_absent};

/// Build the configuration object for a build
///
/// Only the phases are stored. Resource limits go to the pod spec.
pub fn build_config_map(build_name: &str, namespace: &str, phases: &Phases) -> Result<ConfigMap> {
    let document = phases.to_json()?;

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(build_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(build_labels(build_name)),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(CONFIG_FILE_KEY.to_string(), document)])),
        ..Default::default()
    })
}

/// Publish the phase document, replacing any previous version
pub async fn publish_configuration(
    cluster: &dyn ClusterApi,
    build_name: &str,
    namespace: &str,
    phases: &Phases,
    settle: &SettlePolicy,
) -> Result<()> {
    let config_map = build_config_map(build_name, namespace, phases)?;

    if cluster.delete_config_map(namespace, build_name).await? {
        tracing::info!("ConfigMap {}/{} exists, replacing", namespace, build_name);
        wait_until_absent(settle, "configmap", build_name, || async move {
            let existing = cluster.get_config_map(namespace, build_name).await?;
            Ok(existing.is_some())
        })
        .await?;
    }

    cluster.create_config_map(namespace, &config_map).await?;

    tracing::info!(
        "ConfigMap {}/{} published ({} build, {} finalize command(s))",
        namespace,
        build_name,
        phases.build.len(),
        phases.finalize.len()
    );

    Ok(())
}
