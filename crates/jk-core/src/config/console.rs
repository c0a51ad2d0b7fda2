//! Console launcher configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::{default_config_path, load_config, CONFIG_ENV_VAR};
use crate::error::ConfigError;

/// Settings for launching a kernel and attaching a console to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Kernelspec name to launch
    pub kernel_name: String,

    /// How long to wait for the kernel to answer `kernel_info_request`
    #[serde(with = "duration_secs")]
    pub ready_timeout: Duration,

    /// How long to wait for the kernel to exit after `shutdown_request`
    #[serde(with = "duration_secs")]
    pub shutdown_timeout: Duration,

    /// Extra kernelspec directories, searched before the standard ones
    pub kernel_search_paths: Vec<PathBuf>,

    /// Where connection files are written; the Jupyter runtime dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            kernel_name: "ark".to_string(),
            ready_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
            kernel_search_paths: Vec::new(),
            runtime_dir: None,
        }
    }
}

impl ConsoleConfig {
    /// Load the effective configuration
    ///
    /// `$JK_CONSOLE_CONFIG` names a file that must exist. Otherwise the
    /// default path is used when present, and built-in defaults when not.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            tracing::debug!("Loading config from {:?} (from {})", path, CONFIG_ENV_VAR);
            return load_config(&path);
        }

        let path = default_config_path();
        match load_config(&path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Ok(config)
            }
            Err(ConfigError::NotFound(_)) => {
                tracing::debug!("Using default configuration");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }
}
