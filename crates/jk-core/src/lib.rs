//! jk-core: Kernel management for jk-console
//!
//! Finds kernelspecs, allocates ports and connection files, runs the kernel
//! process, and connects a client to its channels.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod kernel;
pub mod kernelspec;
pub mod paths;
pub mod ports;

pub use client::{ChannelMessage, KernelClient};
pub use config::ConsoleConfig;
pub use connection::{ConnectionFile, ConnectionInfo};
pub use error::{ConfigError, KernelError};
pub use kernel::KernelManager;
pub use kernelspec::{InterruptMode, KernelSpec};
pub use ports::{find_available_port, find_available_ports};
