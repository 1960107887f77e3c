//! Service Module
//!
//! Launch logic for the orchestrator. Each step is a free function over a
//! [`ClusterApi`](crate::cluster::ClusterApi) and must complete before the
//! next one starts.

pub mod configuration;
pub mod launch;
pub mod namespace;
pub mod pod;

pub use configuration::publish_configuration;
pub use launch::{BuildTarget, LaunchOptions, launch_build, load_descriptor};
pub use namespace::ensure_namespace;
pub use pod::launch_pod;

use std::collections::BTreeMap;

/// Label marking objects this tool manages
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Label carrying the build name on namespaced objects
pub const BUILD_LABEL: &str = "scicd.io/build";

const MANAGER: &str = "scicd";

fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGER.to_string())])
}

fn build_labels(build_name: &str) -> BTreeMap<String, String> {
    let mut labels = managed_labels();
    labels.insert(BUILD_LABEL.to_string(), build_name.to_string());
    labels
}
