//! Runner configuration
//!
//! Read once from the environment at startup. Every setting has a default so
//! the runner needs no arguments inside the build pod.

use scicd_core::contract::default_config_path;
use std::path::PathBuf;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Phase document mounted from the configuration object
    pub config_path: PathBuf,

    /// Shell that interprets each command (`<shell> -c <command>`)
    pub shell: String,

    /// Working directory for commands, `None` to inherit the runner's
    pub working_dir: Option<PathBuf>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - SCICD_CONFIG_PATH (optional, default: /config/config.json)
    /// - SCICD_SHELL (optional, default: sh)
    /// - SCICD_WORKDIR (optional)
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Creates configuration from any variable source
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|value| !value.is_empty());

        Self {
            config_path: set("SCICD_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_config_path),
            shell: set("SCICD_SHELL").unwrap_or_else(|| "sh".to_string()),
            working_dir: set("SCICD_WORKDIR").map(PathBuf::from),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.config_path.as_os_str().is_empty() {
            anyhow::bail!("config_path cannot be empty");
        }

        if self.shell.trim().is_empty() {
            anyhow::bail!("shell cannot be empty");
        }

        if let Some(dir) = &self.working_dir
            && !dir.is_dir()
        {
            anyhow::bail!("working_dir {} is not a directory", dir.display());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}
