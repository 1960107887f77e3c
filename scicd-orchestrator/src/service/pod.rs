//! Pod Service
//!
//! Builds and (re)creates the single-use build pod.

use k8s_openapi::api::core::v1::Pod;
use scicd_core::contract::{CONFIG_MOUNT_DIR, CONFIG_VOLUME_NAME};
use serde_json::json;

use super::build_labels;
use super::launch::LaunchOptions;
use crate::cluster::ClusterApi;
use crate::error::Result;
use crate::quantity::ResourceLimits;
use crate::settle::wait_until_absent;

/// Name of the only container in the build pod
pub const BUILD_CONTAINER_NAME: &str = "build-container";

/// Build the pod specification
///
/// One container running the runner executable without arguments, the
/// configuration object mounted read-only, and no restarts.
pub fn build_pod(
    build_name: &str,
    namespace: &str,
    limits: &ResourceLimits,
    options: &LaunchOptions,
) -> Result<Pod> {
    let pod = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": build_name,
            "namespace": namespace,
            "labels": build_labels(build_name),
        },
        "spec": {
            "restartPolicy": "Never",
            "containers": [{
                "name": BUILD_CONTAINER_NAME,
                "image": options.image,
                "imagePullPolicy": options.image_pull_policy,
                "command": [options.runner_command],
                "resources": {
                    "limits": {
                        "cpu": limits.cpu.as_str(),
                        "memory": limits.memory.as_str(),
                    }
                },
                "volumeMounts": [{
                    "name": CONFIG_VOLUME_NAME,
                    "mountPath": CONFIG_MOUNT_DIR,
                    "readOnly": true,
                }],
            }],
            "volumes": [{
                "name": CONFIG_VOLUME_NAME,
                "configMap": { "name": build_name },
            }],
        }
    }))?;

    Ok(pod)
}

/// Replace any previous pod of the same name with a fresh build pod
///
/// Deleting a pod that does not exist is fine. After a delete, waits for the
/// old pod to be gone before creating the new one.
pub async fn launch_pod(
    cluster: &dyn ClusterApi,
    build_name: &str,
    namespace: &str,
    limits: &ResourceLimits,
    options: &LaunchOptions,
) -> Result<()> {
    let pod = build_pod(build_name, namespace, limits, options)?;

    tracing::info!(
        "Pod {}/{} limits: cpu={} ({}m), memory={}",
        namespace,
        build_name,
        limits.cpu.as_str(),
        limits.cpu.millis(),
        limits.memory.as_str()
    );

    if cluster.delete_pod(namespace, build_name).await? {
        tracing::info!(
            "Deleted previous pod {}/{}, waiting for it to terminate",
            namespace,
            build_name
        );
        wait_until_absent(&options.settle, "pod", build_name, || async move {
            Ok(cluster.get_pod(namespace, build_name).await?.is_some())
        })
        .await?;
    } else {
        tracing::debug!("No previous pod {}/{}", namespace, build_name);
    }

    cluster.create_pod(namespace, &pod).await?;

    tracing::info!("Build pod {}/{} created", namespace, build_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterOp, InMemoryCluster};
    use crate::settle::SettlePolicy;
    use k8s_openapi::api::core::v1::Namespace;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use scicd_core::domain::pipeline::PodResources;
    use std::time::Duration;

    fn limits(cpu: &str, memory: &str) -> ResourceLimits {
        ResourceLimits::from_pod(&PodResources {
            cpu: cpu.to_string(),
            memory: memory.to_string(),
        })
        .unwrap()
    }

    fn options() -> LaunchOptions {
        LaunchOptions {
            settle: SettlePolicy {
                timeout: Duration::from_millis(500),
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
            ..LaunchOptions::default()
        }
    }

    fn cluster() -> InMemoryCluster {
        InMemoryCluster::new().with_namespace(Namespace {
            metadata: ObjectMeta {
                name: Some("scicd".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_pod_spec_shape() {
        let options = options();
        let pod = build_pod("job1", "scicd", &limits("1", "512Mi"), &options).unwrap();
        let spec = serde_json::to_value(&pod).unwrap();

        assert_eq!(spec["metadata"]["name"], "job1");
        assert_eq!(spec["metadata"]["namespace"], "scicd");
        assert_eq!(spec["spec"]["restartPolicy"], "Never");

        let containers = spec["spec"]["containers"].as_array().unwrap();
        assert_eq!(containers.len(), 1);
        let container = &containers[0];
        assert_eq!(container["name"], BUILD_CONTAINER_NAME);
        assert_eq!(container["image"], options.image.as_str());
        assert_eq!(container["imagePullPolicy"], "Always");
        assert_eq!(container["command"], json!([options.runner_command]));
        assert!(container.get("args").is_none());
        assert_eq!(container["volumeMounts"][0]["name"], CONFIG_VOLUME_NAME);
        assert_eq!(container["volumeMounts"][0]["mountPath"], "/config");

        let volumes = spec["spec"]["volumes"].as_array().unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0]["name"], CONFIG_VOLUME_NAME);
        assert_eq!(volumes[0]["configMap"]["name"], "job1");
    }

    #[test]
    fn test_pod_limits() {
        let pod = build_pod("job1", "scicd", &limits("500m", "1Gi"), &options()).unwrap();
        let spec = pod.spec.unwrap();
        let container = &spec.containers[0];
        let limits = container
            .resources
            .as_ref()
            .and_then(|r| r.limits.as_ref())
            .unwrap();

        assert_eq!(limits["cpu"], Quantity("500m".to_string()));
        assert_eq!(limits["memory"], Quantity("1Gi".to_string()));
    }

    #[tokio::test]
    async fn test_launch_creates_pod_without_previous() {
        let cluster = cluster();

        launch_pod(&cluster, "job1", "scicd", &limits("1", "512Mi"), &options())
            .await
            .unwrap();

        assert_eq!(cluster.pods().len(), 1);
        assert_eq!(
            cluster.ops(),
            vec![ClusterOp::DeletePod, ClusterOp::CreatePod]
        );
    }

    #[tokio::test]
    async fn test_launch_replaces_terminating_pod() {
        let old = build_pod("job1", "scicd", &limits("2", "2Gi"), &options()).unwrap();
        let cluster = cluster().with_pod("scicd", old).with_deletion_lag(1);

        launch_pod(&cluster, "job1", "scicd", &limits("1", "512Mi"), &options())
            .await
            .unwrap();

        let pods = cluster.pods();
        assert_eq!(pods.len(), 1);
        let limits = pods[0].spec.as_ref().unwrap().containers[0]
            .resources
            .as_ref()
            .and_then(|r| r.limits.clone())
            .unwrap();
        assert_eq!(limits["cpu"], Quantity("1".to_string()));
        assert_eq!(
            cluster.ops(),
            vec![
                ClusterOp::DeletePod,
                ClusterOp::GetPod,
                ClusterOp::GetPod,
                ClusterOp::CreatePod
            ]
        );
    }

    #[tokio::test]
    async fn test_launch_fails_when_old_pod_never_goes_away() {
        let old = build_pod("job1", "scicd", &limits("1", "1Gi"), &options()).unwrap();
        let cluster = cluster().with_pod("scicd", old).with_deletion_lag(u32::MAX);

        let mut options = options();
        options.settle.timeout = Duration::from_millis(20);

        let err = launch_pod(&cluster, "job1", "scicd", &limits("1", "512Mi"), &options)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::error::OrchestrationError::SettleTimeout { kind: "pod", .. }
        ));
        assert!(!cluster.ops().contains(&ClusterOp::CreatePod));
    }

    #[tokio::test]
    async fn test_delete_failure_is_surfaced() {
        let cluster = cluster().fail_on(ClusterOp::DeletePod, "forbidden");

        let err = launch_pod(&cluster, "job1", "scicd", &limits("1", "512Mi"), &options())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("forbidden"));
        assert!(cluster.pods().is_empty());
    }
}
