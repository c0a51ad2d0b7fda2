//! Kernel process management
//!
//! Owns the kernel subprocess and its connection file for the lifetime of a
//! console session.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use jk_protocol::content::KernelInfoReply;
use tokio::process::{Child, Command};

use crate::client::KernelClient;
use crate::config::ConsoleConfig;
use crate::connection::{new_connection_file_name, ConnectionFile, ConnectionInfo};
use crate::error::KernelError;
use crate::kernelspec::{InterruptMode, KernelSpec};
use crate::paths::{jupyter_runtime_dir, kernel_dirs};

/// A running kernel process
#[derive(Debug)]
pub struct KernelManager {
    spec: KernelSpec,
    connection: ConnectionFile,
    child: Child,
}

impl KernelManager {
    /// Resolve the configured kernelspec and start the kernel
    ///
    /// `extra_args` are appended verbatim to the kernelspec's command line.
    pub fn start(config: &ConsoleConfig, extra_args: &[String]) -> Result<Self, KernelError> {
        let search_dirs = kernel_dirs(&config.kernel_search_paths);
        let spec = KernelSpec::find(&config.kernel_name, &search_dirs)?;
        let runtime_dir = config
            .runtime_dir
            .clone()
            .unwrap_or_else(jupyter_runtime_dir);
        Self::start_with_spec(spec, extra_args, &runtime_dir)
    }

    /// Start a kernel from an already resolved spec
    ///
    /// The connection file is written into `runtime_dir`.
    pub fn start_with_spec(
        spec: KernelSpec,
        extra_args: &[String],
        runtime_dir: &Path,
    ) -> Result<Self, KernelError> {
        let info = ConnectionInfo::allocate(&spec.name)?;
        let connection = ConnectionFile::write(runtime_dir.join(new_connection_file_name()), info)?;

        let argv = spec.command_line(connection.path(), extra_args);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| KernelError::InvalidSpec {
                path: spec.resource_dir.clone(),
                reason: "argv is empty".to_string(),
            })?;

        tracing::info!("Starting kernel '{}': {:?}", spec.name, argv);

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Keep terminal Ctrl+C away from the kernel; interrupts are forwarded explicitly
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| KernelError::Spawn {
            program: program.clone(),
            source,
        })?;

        tracing::debug!(pid = ?child.id(), "Kernel process spawned");

        Ok(Self {
            spec,
            connection,
            child,
        })
    }

    /// The kernelspec this kernel was started from
    pub fn spec(&self) -> &KernelSpec {
        &self.spec
    }

    /// Connection details written for the kernel
    pub fn connection_info(&self) -> &ConnectionInfo {
        self.connection.info()
    }

    /// Path of the connection file
    pub fn connection_file(&self) -> &Path {
        self.connection.path()
    }

    /// Open channels and wait until the kernel answers, bounded by `timeout`
    ///
    /// Fails with `ReadinessTimeout` if the kernel stays silent, or
    /// `KernelDied` if its process exits first. Neither is retried.
    pub async fn connect_ready(
        &mut self,
        timeout: Duration,
    ) -> Result<(KernelClient, KernelInfoReply), KernelError> {
        let info = self.connection_info().clone();
        let ready = async {
            let mut client = KernelClient::connect(&info).await?;
            let reply = client.wait_for_ready().await?;
            Ok::<_, KernelError>((client, reply))
        };

        tokio::select! {
            result = tokio::time::timeout(timeout, ready) => match result {
                Ok(ready) => ready,
                Err(_) => {
                    tracing::error!("Kernel didn't respond within {:?}", timeout);
                    Err(KernelError::ReadinessTimeout { timeout })
                }
            },
            status = self.child.wait() => Err(KernelError::KernelDied { status: status? }),
        }
    }

    /// Exit status if the kernel has already exited
    pub fn try_exit_status(&mut self) -> Result<Option<ExitStatus>, KernelError> {
        Ok(self.child.try_wait()?)
    }

    /// Whether the kernel process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Wait for the kernel process to exit
    pub async fn wait(&mut self) -> Result<ExitStatus, KernelError> {
        Ok(self.child.wait().await?)
    }

    /// Interrupt running code the way the kernelspec asks for
    pub async fn interrupt(&self, client: &mut KernelClient) -> Result<(), KernelError> {
        match self.spec.interrupt_mode {
            InterruptMode::Signal => self.signal_interrupt(),
            InterruptMode::Message => client.interrupt_request().await,
        }
    }

    #[cfg(unix)]
    fn signal_interrupt(&self) -> Result<(), KernelError> {
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        tracing::debug!(pid, "Sending SIGINT to kernel process group");
        // The kernel leads its own process group (see `start_with_spec`)
        let result = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGINT) };
        if result != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn signal_interrupt(&self) -> Result<(), KernelError> {
        tracing::warn!("Signal interrupts are not supported on this platform");
        Ok(())
    }

    /// Ask the kernel to exit, then kill it if it outlives `grace`
    ///
    /// The connection file is removed when the manager is dropped.
    pub async fn shutdown(
        &mut self,
        client: &mut KernelClient,
        grace: Duration,
    ) -> Result<(), KernelError> {
        if let Some(status) = self.try_exit_status()? {
            tracing::debug!("Kernel already exited ({})", status);
            return Ok(());
        }

        if let Err(e) = client.shutdown_request().await {
            tracing::warn!("Failed to send shutdown request: {}", e);
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                tracing::info!("Kernel exited ({})", status?);
            }
            Err(_) => {
                tracing::warn!("Kernel did not exit within {:?}, killing it", grace);
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}
