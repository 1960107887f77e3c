//! Configuration object contract
//!
//! The orchestrator publishes the phase document as a single-key configuration
//! object and mounts it into the build pod. The runner reads it back from the
//! same location. Changing any of these values breaks running pods.

use std::path::PathBuf;

/// Directory the configuration object is mounted at inside the build container
pub const CONFIG_MOUNT_DIR: &str = "/config";

/// Key under which the phase document is stored in the configuration object
pub const CONFIG_FILE_KEY: &str = "config.json";

/// Name of the pod volume backed by the configuration object
pub const CONFIG_VOLUME_NAME: &str = "user-config-volume";

/// Full path of the phase document as seen by the runner
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_MOUNT_DIR).join(CONFIG_FILE_KEY)
}
