//! Kernelspec discovery
//!
//! A kernelspec is a directory named after the kernel containing a
//! `kernel.json` that describes how to launch it:
//!
//! ```json
//! {
//!   "argv": ["/usr/local/bin/ark", "--connection_file", "{connection_file}", "--session-mode", "console"],
//!   "display_name": "Ark R Kernel",
//!   "language": "R",
//!   "env": {"RUST_LOG": "error"}
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::KernelError;

/// File name of the spec inside a kernel's resource directory
pub const KERNEL_JSON: &str = "kernel.json";

/// How the kernel wants to be interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptMode {
    /// Send SIGINT to the kernel's process group
    #[default]
    Signal,
    /// Send `interrupt_request` on the control channel
    Message,
}

#[derive(Debug, Deserialize)]
struct KernelJson {
    argv: Vec<String>,
    display_name: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    interrupt_mode: InterruptMode,
    #[serde(default)]
    env: HashMap<String, String>,
}

/// A resolved kernelspec
#[derive(Debug, Clone)]
pub struct KernelSpec {
    /// Kernel name (directory name)
    pub name: String,
    /// Directory the spec was loaded from
    pub resource_dir: PathBuf,
    /// Launch command template
    pub argv: Vec<String>,
    /// Human-readable name
    pub display_name: String,
    /// Language the kernel runs
    pub language: String,
    /// How to interrupt running code
    pub interrupt_mode: InterruptMode,
    /// Extra environment for the kernel process
    pub env: HashMap<String, String>,
}

impl KernelSpec {
    /// Find a kernelspec by name in the given directories, first match wins
    pub fn find(name: &str, search_dirs: &[PathBuf]) -> Result<Self, KernelError> {
        let dir_name = name.to_lowercase();

        for dir in search_dirs {
            let resource_dir = dir.join(&dir_name);
            if resource_dir.join(KERNEL_JSON).is_file() {
                tracing::debug!("Found kernelspec '{}' in {:?}", name, resource_dir);
                return Self::from_dir(&dir_name, &resource_dir);
            }
        }

        Err(KernelError::NoSuchKernel {
            name: name.to_string(),
            searched: search_dirs.to_vec(),
        })
    }

    /// Load the spec in `resource_dir/kernel.json`
    pub fn from_dir(name: &str, resource_dir: &Path) -> Result<Self, KernelError> {
        let path = resource_dir.join(KERNEL_JSON);
        let invalid = |reason: String| KernelError::InvalidSpec {
            path: path.clone(),
            reason,
        };

        let text = std::fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
        let json: KernelJson = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        if json.argv.is_empty() {
            return Err(invalid("argv is empty".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            resource_dir: resource_dir.to_path_buf(),
            argv: json.argv,
            display_name: json.display_name,
            language: json.language,
            interrupt_mode: json.interrupt_mode,
            env: json.env,
        })
    }

    /// Expand the launch command for a connection file, appending extra arguments
    pub fn command_line(&self, connection_file: &Path, extra_args: &[String]) -> Vec<String> {
        let connection_file = connection_file.to_string_lossy();
        let resource_dir = self.resource_dir.to_string_lossy();

        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{connection_file}", &connection_file)
                    .replace("{resource_dir}", &resource_dir)
            })
            .chain(extra_args.iter().cloned())
            .collect()
    }
}
