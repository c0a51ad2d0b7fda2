//! Core error types for jk-console

use jk_protocol::ProtocolError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while starting, talking to, or stopping a kernel
#[derive(Error, Debug)]
pub enum KernelError {
    /// No kernelspec with this name in any search directory
    #[error("No such kernel named '{name}' (searched: {searched:?})")]
    NoSuchKernel { name: String, searched: Vec<PathBuf> },

    /// kernel.json exists but cannot be used
    #[error("Invalid kernelspec {path:?}: {reason}")]
    InvalidSpec { path: PathBuf, reason: String },

    /// Kernel process could not be spawned
    #[error("Failed to start kernel '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Kernel did not answer `kernel_info_request` in time
    #[error("Kernel didn't respond in {} seconds", .timeout.as_secs_f64())]
    ReadinessTimeout { timeout: Duration },

    /// Kernel process exited while we were waiting on it
    #[error("Kernel died before replying ({status})")]
    KernelDied { status: ExitStatus },

    /// ZeroMQ socket failure
    #[error("Channel error: {0}")]
    Channel(#[from] zeromq::ZmqError),

    /// Socket identity could not be set
    #[error("Invalid channel identity: {0}")]
    Identity(String),

    /// Message encoding/decoding failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
