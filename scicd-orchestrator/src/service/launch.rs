//! Launch Service
//!
//! Turns a pipeline descriptor into a running build pod.

use scicd_core::domain::pipeline::PipelineDescriptor;
use std::path::Path;

use super::{ensure_namespace, launch_pod, publish_configuration};
use crate::cluster::ClusterApi;
use crate::error::{OrchestrationError, Result};
use crate::quantity::ResourceLimits;
use crate::settle::SettlePolicy;

/// Image the build pod runs when none is configured
pub const DEFAULT_IMAGE: &str = "scicd/runner:latest";

/// Runner executable inside the image
pub const DEFAULT_RUNNER_COMMAND: &str = "/usr/local/bin/scicd-runner";

/// Where a build goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Names both the configuration object and the pod
    pub build_name: String,
    pub namespace: String,
}

/// How the build pod is set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub image: String,
    pub image_pull_policy: String,
    pub runner_command: String,
    pub settle: SettlePolicy,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            image_pull_policy: "Always".to_string(),
            runner_command: DEFAULT_RUNNER_COMMAND.to_string(),
            settle: SettlePolicy::default(),
        }
    }
}

/// Read and parse a descriptor file
pub fn load_descriptor(path: &Path) -> Result<PipelineDescriptor> {
    let source =
        std::fs::read_to_string(path).map_err(|source| OrchestrationError::DescriptorRead {
            path: path.to_path_buf(),
            source,
        })?;

    PipelineDescriptor::from_json(&source).map_err(|source| OrchestrationError::DescriptorParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Launch a build
///
/// Input is validated before the cluster is contacted. The steps then run in
/// order: namespace, configuration object, pod. A failing step stops the
/// launch; objects created by earlier steps are left in place.
pub async fn launch_build(
    cluster: &dyn ClusterApi,
    descriptor: &PipelineDescriptor,
    target: &BuildTarget,
    options: &LaunchOptions,
) -> Result<()> {
    validate_name("build", &target.build_name)?;
    validate_name("namespace", &target.namespace)?;
    let limits = ResourceLimits::from_pod(&descriptor.pod)?;

    tracing::info!(
        "Launching build {} in namespace {}",
        target.build_name,
        target.namespace
    );

    ensure_namespace(cluster, &target.namespace).await?;

    publish_configuration(
        cluster,
        &target.build_name,
        &target.namespace,
        &descriptor.phases,
        &options.settle,
    )
    .await?;

    launch_pod(
        cluster,
        &target.build_name,
        &target.namespace,
        &limits,
        options,
    )
    .await?;

    tracing::info!("Build {} launched", target.build_name);
    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

/// Names must be RFC 1123 labels: the namespace is one, and the build name is
/// also used as a label value.
fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    let invalid = |reason: &str| OrchestrationError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > 63 {
        return Err(invalid("must be at most 63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "must contain only lowercase letters, digits and '-'",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterOp, InMemoryCluster};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use scicd_core::contract::CONFIG_FILE_KEY;
    use scicd_core::domain::pipeline::Phases;
    use std::io::Write;
    use std::time::Duration;

    const END_TO_END: &str = r#"{"pod":{"cpu":"1","memory":"512Mi"},"phases":{"build":["echo hi"],"artifacts":{"local_target_dir":"/out","remote_target_dir":"s3://bucket/out"},"finalize":["echo done"]}}"#;

    fn target() -> BuildTarget {
        BuildTarget {
            build_name: "job1".to_string(),
            namespace: "scicd".to_string(),
        }
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

    fn descriptor_with(cpu: &str, memory: &str) -> PipelineDescriptor {
        let mut descriptor = PipelineDescriptor::from_json(END_TO_END).unwrap();
        descriptor.pod.cpu = cpu.to_string();
        descriptor.pod.memory = memory.to_string();
        descriptor
    }

    #[tokio::test]
    async fn test_end_to_end_launch() {
        let cluster = InMemoryCluster::new();
        let descriptor = PipelineDescriptor::from_json(END_TO_END).unwrap();

        launch_build(&cluster, &descriptor, &target(), &options())
            .await
            .unwrap();

        let namespaces = cluster.namespaces();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].metadata.name.as_deref(), Some("scicd"));

        let config_maps = cluster.config_maps();
        assert_eq!(config_maps.len(), 1);
        assert_eq!(config_maps[0].metadata.name.as_deref(), Some("job1"));
        let data = config_maps[0].data.as_ref().unwrap();
        assert_eq!(
            Phases::from_json(&data[CONFIG_FILE_KEY]).unwrap(),
            descriptor.phases
        );

        let pods = cluster.pods();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name.as_deref(), Some("job1"));
        let limits = pods[0].spec.as_ref().unwrap().containers[0]
            .resources
            .as_ref()
            .and_then(|r| r.limits.clone())
            .unwrap();
        assert_eq!(limits["cpu"], Quantity("1".to_string()));
        assert_eq!(limits["memory"], Quantity("512Mi".to_string()));
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let cluster = InMemoryCluster::new();
        let descriptor = PipelineDescriptor::from_json(END_TO_END).unwrap();

        launch_build(&cluster, &descriptor, &target(), &options())
            .await
            .unwrap();

        assert_eq!(
            cluster.ops(),
            vec![
                ClusterOp::GetNamespace,
                ClusterOp::CreateNamespace,
                ClusterOp::DeleteConfigMap,
                ClusterOp::CreateConfigMap,
                ClusterOp::DeletePod,
                ClusterOp::CreatePod
            ]
        );
    }

    #[tokio::test]
    async fn test_relaunch_replaces_everything_once() {
        let cluster = InMemoryCluster::new().with_deletion_lag(1);
        let first = PipelineDescriptor::from_json(END_TO_END).unwrap();
        launch_build(&cluster, &first, &target(), &options())
            .await
            .unwrap();

        let mut second = first.clone();
        second.phases.build = vec!["cargo build".to_string()];
        launch_build(&cluster, &second, &target(), &options())
            .await
            .unwrap();

        assert_eq!(cluster.namespaces().len(), 1);
        assert_eq!(cluster.pods().len(), 1);
        let config_maps = cluster.config_maps();
        assert_eq!(config_maps.len(), 1);
        let data = config_maps[0].data.as_ref().unwrap();
        assert_eq!(
            Phases::from_json(&data[CONFIG_FILE_KEY]).unwrap(),
            second.phases
        );
    }

    #[tokio::test]
    async fn test_invalid_quantity_makes_no_cluster_calls() {
        for (cpu, memory) in [
            ("one", "512Mi"),
            ("1", "512MB"),
            ("", "1Gi"),
            ("1", "-1Gi"),
        ] {
            let cluster = InMemoryCluster::new();

            let err = launch_build(
                &cluster,
                &descriptor_with(cpu, memory),
                &target(),
                &options(),
            )
            .await
            .unwrap_err();

            assert!(matches!(err, OrchestrationError::InvalidQuantity { .. }));
            assert!(cluster.calls().is_empty(), "cpu={} memory={}", cpu, memory);
        }
    }

    #[tokio::test]
    async fn test_invalid_names_make_no_cluster_calls() {
        let cluster = InMemoryCluster::new();
        let descriptor = PipelineDescriptor::from_json(END_TO_END).unwrap();

        for (build_name, namespace) in [("", "scicd"), ("Job1", "scicd"), ("job1", "-ns")] {
            let target = BuildTarget {
                build_name: build_name.to_string(),
                namespace: namespace.to_string(),
            };
            let err = launch_build(&cluster, &descriptor, &target, &options())
                .await
                .unwrap_err();
            assert!(matches!(err, OrchestrationError::InvalidName { .. }));
        }

        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pod_never_created_when_publish_fails() {
        let cluster = InMemoryCluster::new().fail_on(ClusterOp::CreateConfigMap, "etcd timeout");
        let descriptor = PipelineDescriptor::from_json(END_TO_END).unwrap();

        let err = launch_build(&cluster, &descriptor, &target(), &options())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("etcd timeout"));
        assert!(!cluster.ops().contains(&ClusterOp::DeletePod));
        assert!(!cluster.ops().contains(&ClusterOp::CreatePod));
        // No rollback of the namespace
        assert_eq!(cluster.namespaces().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_cluster_is_surfaced() {
        let cluster = InMemoryCluster::new().fail_on(ClusterOp::GetNamespace, "connection refused");
        let descriptor = PipelineDescriptor::from_json(END_TO_END).unwrap();

        let err = launch_build(&cluster, &descriptor, &target(), &options())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Cluster(_)));
        assert_eq!(cluster.ops(), vec![ClusterOp::GetNamespace]);
    }

    #[test]
    fn test_load_descriptor_distinguishes_missing_and_malformed() {
        let err = load_descriptor(Path::new("/nonexistent/descriptor.json")).unwrap_err();
        assert!(matches!(err, OrchestrationError::DescriptorRead { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"pod\": ").unwrap();
        let err = load_descriptor(file.path()).unwrap_err();
        assert!(matches!(err, OrchestrationError::DescriptorParse { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(END_TO_END.as_bytes()).unwrap();
        let descriptor = load_descriptor(file.path()).unwrap();
        assert_eq!(descriptor.pod.memory, "512Mi");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("build", "job1").is_ok());
        assert!(validate_name("build", "a").is_ok());
        assert!(validate_name("build", "my-build-2").is_ok());
        assert!(validate_name("build", "").is_err());
        assert!(validate_name("build", "job_1").is_err());
        assert!(validate_name("build", "job.1").is_err());
        assert!(validate_name("build", "job1-").is_err());
        assert!(validate_name("build", &"a".repeat(64)).is_err());
    }
}
