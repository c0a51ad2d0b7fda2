//! Termination signals
//!
//! The kernel runs in its own process group, so terminal signals only reach
//! the launcher. Handlers are installed before the kernel starts; on a
//! termination signal the launcher unwinds normally, which stops the kernel
//! and removes its connection file.

use std::io;

/// Signals that end the launcher
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Install the handlers; signals arriving from now on are observed
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for SIGINT, SIGTERM, or SIGHUP while the kernel is starting
    #[cfg(unix)]
    pub async fn startup(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }

    #[cfg(not(unix))]
    pub async fn startup(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(_) => std::future::pending().await,
        }
    }

    /// Wait for SIGTERM or SIGHUP during the session
    ///
    /// SIGINT is left to the console, which forwards it to the kernel.
    #[cfg(unix)]
    pub async fn session(&mut self) -> &'static str {
        tokio::select! {
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }

    #[cfg(not(unix))]
    pub async fn session(&mut self) -> &'static str {
        std::future::pending().await
    }
}
