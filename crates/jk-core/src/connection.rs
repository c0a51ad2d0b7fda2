//! Kernel connection files
//!
//! The connection file tells a kernel which ports to bind and which key to
//! sign messages with. It is written before the kernel starts and removed
//! when the owning [`ConnectionFile`] guard is dropped.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::ports::{find_available_ports, LOOPBACK};

/// Signature scheme written into every connection file
pub const SIGNATURE_SCHEME: &str = jk_protocol::signing::HMAC_SHA256;

/// Contents of a connection file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub ip: String,
    pub transport: String,
    pub shell_port: u16,
    pub iopub_port: u16,
    pub stdin_port: u16,
    pub control_port: u16,
    pub hb_port: u16,
    pub key: String,
    pub signature_scheme: String,
    #[serde(default)]
    pub kernel_name: String,
}

impl ConnectionInfo {
    /// Allocate five fresh loopback ports and a random signing key
    pub fn allocate(kernel_name: &str) -> io::Result<Self> {
        let ports = find_available_ports(5)?;

        Ok(Self {
            ip: LOOPBACK.to_string(),
            transport: "tcp".to_string(),
            shell_port: ports[0],
            iopub_port: ports[1],
            stdin_port: ports[2],
            control_port: ports[3],
            hb_port: ports[4],
            key: Uuid::new_v4().simple().to_string(),
            signature_scheme: SIGNATURE_SCHEME.to_string(),
            kernel_name: kernel_name.to_string(),
        })
    }

    /// ZeroMQ endpoint for a port, e.g. `tcp://127.0.0.1:5555`
    pub fn endpoint(&self, port: u16) -> String {
        format!("{}://{}:{}", self.transport, self.ip, port)
    }

    /// Read a connection file
    pub fn read(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Default file name for a new connection file
pub fn new_connection_file_name() -> String {
    format!("kernel-{}.json", Uuid::new_v4())
}

/// Guard that owns a written connection file and removes it when dropped
#[derive(Debug)]
pub struct ConnectionFile {
    path: PathBuf,
    info: ConnectionInfo,
}

impl ConnectionFile {
    /// Write `info` to `path`, creating parent directories
    ///
    /// On Unix the file is readable by the owner only, since it holds the
    /// signing key.
    pub fn write(path: PathBuf, info: ConnectionInfo) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&info)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // Private from the moment it exists; the key is never world-readable
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;
        file.write_all(json.as_bytes())?;

        tracing::debug!("Wrote connection file {:?}", path);
        Ok(Self { path, info })
    }

    /// Path of the file on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection details
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }
}

impl Drop for ConnectionFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed connection file {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove connection file {:?}: {}", self.path, e),
        }
    }
}
