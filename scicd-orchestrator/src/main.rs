//! SciCD Orchestrator
//!
//! Provisions a single-use build environment on a Kubernetes cluster:
//! - Namespace: created if missing
//! - ConfigMap: the pipeline's phases, replaced on every launch
//! - Pod: the phase runner with the declared CPU/memory limits
//!
//! The runner inside the pod reads the mounted phases and executes them.
//! Success or failure is observed through the pod status.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scicd_core::domain::pipeline::PipelineDescriptor;
use scicd_orchestrator::cluster::{ClusterApi, InMemoryCluster, KubeCluster};
use scicd_orchestrator::config::{Cli, Config};
use scicd_orchestrator::service::{launch_build, load_descriptor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scicd_orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_cli(Cli::parse());
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting SciCD Orchestrator: build={}, namespace={}, descriptor={}",
        config.target.build_name,
        config.target.namespace,
        config.descriptor_path.display()
    );

    let descriptor = load_descriptor(&config.descriptor_path)?;
    info!(
        "Loaded descriptor: cpu={}, memory={}, {} command(s)",
        descriptor.pod.cpu,
        descriptor.pod.memory,
        descriptor.phases.command_count()
    );

    if config.dry_run {
        info!("Dry run: using in-memory cluster");
        let cluster = InMemoryCluster::new();
        launch(&cluster, &config, &descriptor).await?;
        info!("Dry run issued {} cluster call(s)", cluster.calls().len());

        let objects = serde_json::json!({
            "namespaces": cluster.namespaces(),
            "configMaps": cluster.config_maps(),
            "pods": cluster.pods(),
        });
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }

    let cluster = KubeCluster::connect(config.kubeconfig.as_deref())
        .await
        .context("Failed to connect to cluster")?;

    launch(&cluster, &config, &descriptor).await?;

    info!("Build pod created successfully");
    Ok(())
}

async fn launch(
    cluster: &dyn ClusterApi,
    config: &Config,
    descriptor: &PipelineDescriptor,
) -> Result<()> {
    if let Err(err) = launch_build(cluster, descriptor, &config.target, &config.launch).await {
        if err.is_input_error() {
            error!("Rejected before contacting the cluster: {}", err);
        } else {
            error!(
                "Launch stopped, objects created so far are left in place: {}",
                err
            );
        }
        return Err(err)
            .with_context(|| format!("Failed to launch build {}", config.target.build_name));
    }
    Ok(())
}
