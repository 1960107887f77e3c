//! Orchestrator configuration
//!
//! Command-line flags are parsed once at startup into an immutable [`Config`]
//! that is passed explicitly to everything that needs it.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::service::launch::{DEFAULT_IMAGE, DEFAULT_RUNNER_COMMAND};
use crate::service::{BuildTarget, LaunchOptions};
use crate::settle::SettlePolicy;

const PULL_POLICIES: [&str; 3] = ["Always", "IfNotPresent", "Never"];

#[derive(Debug, Parser)]
#[command(name = "scicd-orchestrator")]
#[command(about = "Launch a single-use build pod from a pipeline descriptor", long_about = None)]
pub struct Cli {
    /// Path to the kubeconfig file (inferred when omitted)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Name of the build; names the configuration object and the pod
    #[arg(long = "build", env = "SCICD_BUILD")]
    pub build_name: String,

    /// Namespace of the build
    #[arg(long, env = "SCICD_NAMESPACE", default_value = "scicd")]
    pub namespace: String,

    /// Path to the JSON pipeline descriptor
    #[arg(long = "json-config", alias = "jsonConfig", env = "SCICD_DESCRIPTOR")]
    pub descriptor: PathBuf,

    /// Image the build pod runs
    #[arg(long, env = "SCICD_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Pull policy for the build image
    #[arg(long, default_value = "Always")]
    pub image_pull_policy: String,

    /// Runner executable inside the image
    #[arg(long, default_value = DEFAULT_RUNNER_COMMAND)]
    pub runner_command: String,

    /// Seconds to wait for a replaced object to disappear
    #[arg(long, env = "SCICD_SETTLE_TIMEOUT", default_value_t = 60)]
    pub settle_timeout: u64,

    /// Run against an in-memory cluster and print the resulting objects
    #[arg(long)]
    pub dry_run: bool,
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit kubeconfig, `None` to infer
    pub kubeconfig: Option<PathBuf>,

    /// Pipeline descriptor file
    pub descriptor_path: PathBuf,

    pub target: BuildTarget,

    pub launch: LaunchOptions,

    pub dry_run: bool,
}

impl Config {
    /// Builds the configuration from parsed flags
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            kubeconfig: cli.kubeconfig,
            descriptor_path: cli.descriptor,
            target: BuildTarget {
                build_name: cli.build_name,
                namespace: cli.namespace,
            },
            launch: LaunchOptions {
                image: cli.image,
                image_pull_policy: cli.image_pull_policy,
                runner_command: cli.runner_command,
                settle: SettlePolicy::with_timeout(Duration::from_secs(cli.settle_timeout)),
            },
            dry_run: cli.dry_run,
        }
    }

    /// Validates the configuration
    ///
    /// Build and namespace names are checked by the launch itself.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.descriptor_path.as_os_str().is_empty() {
            anyhow::bail!("descriptor path cannot be empty");
        }

        if self.launch.image.is_empty() {
            anyhow::bail!("image cannot be empty");
        }

        if self.launch.runner_command.is_empty() {
            anyhow::bail!("runner_command cannot be empty");
        }

        if !PULL_POLICIES.contains(&self.launch.image_pull_policy.as_str()) {
            anyhow::bail!(
                "image_pull_policy must be one of {}",
                PULL_POLICIES.join(", ")
            );
        }

        if self.launch.settle.timeout.is_zero() {
            anyhow::bail!("settle_timeout must be greater than 0");
        }

        Ok(())
    }
}
