//! Kernel launch and LSP handshake
//!
//! Starts the configured kernel, waits until it answers, and tells it where
//! the language server client is listening.

use jk_core::{ConsoleConfig, KernelClient, KernelError, KernelManager};
use jk_protocol::content::KernelInfoReply;
use serde_json::json;

/// Launcher flag carrying the LSP side-channel address
pub const LSP_CHANNEL_FLAG: &str = "--lsp-channel=";

/// Address used when no `--lsp-channel=` flag is given
pub const DEFAULT_LSP_CHANNEL: &str = "127.0.0.1:0";

/// Comm target the kernel's LSP service registers
pub const LSP_COMM_TARGET: &str = "positron.lsp";

/// Comm ID for the LSP side channel
pub const LSP_COMM_ID: &str = "lsp";

/// Launcher arguments split into the LSP address and kernel pass-through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    pub lsp_channel: String,
    pub kernel_args: Vec<String>,
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self {
            lsp_channel: DEFAULT_LSP_CHANNEL.to_string(),
            kernel_args: Vec::new(),
        }
    }
}

impl LaunchArgs {
    /// Split the launcher's arguments (program name excluded)
    ///
    /// The last `--lsp-channel=` wins. Everything else goes to the kernel
    /// unchanged and in order.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Self::default();
        for arg in args {
            let arg = arg.into();
            match arg.strip_prefix(LSP_CHANNEL_FLAG) {
                Some(address) => parsed.lsp_channel = address.to_string(),
                None => parsed.kernel_args.push(arg),
            }
        }
        parsed
    }
}

/// A kernel that is up and has been sent the LSP handshake
pub struct Launched {
    pub kernel: KernelManager,
    pub client: KernelClient,
    pub info: KernelInfoReply,
}

/// Start the kernel, wait for it to become ready, and open the LSP comm
///
/// Readiness is bounded by `config.ready_timeout` and never retried.
pub async fn launch(args: &LaunchArgs, config: &ConsoleConfig) -> Result<Launched, KernelError> {
    let mut kernel = KernelManager::start(config, &args.kernel_args)?;
    let (mut client, info) = kernel.connect_ready(config.ready_timeout).await?;

    tracing::info!(
        "Kernel '{}' ready ({} {})",
        kernel.spec().name,
        info.implementation,
        info.implementation_version
    );

    client
        .open_comm(
            LSP_COMM_TARGET,
            LSP_COMM_ID,
            json!({ "client_address": args.lsp_channel }),
        )
        .await?;
    tracing::info!("Sent LSP handshake for {}", args.lsp_channel);

    Ok(Launched {
        kernel,
        client,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsp_channel_is_extracted() {
        let args = LaunchArgs::parse(["--lsp-channel=127.0.0.1:9999", "--extra-flag"]);
        assert_eq!(args.lsp_channel, "127.0.0.1:9999");
        assert_eq!(args.kernel_args, vec!["--extra-flag"]);
    }

    #[test]
    fn test_default_lsp_channel() {
        let args = LaunchArgs::parse(["--extra-flag"]);
        assert_eq!(args.lsp_channel, "127.0.0.1:0");
        assert_eq!(args.kernel_args, vec!["--extra-flag"]);

        let empty = LaunchArgs::parse(Vec::<String>::new());
        assert_eq!(empty, LaunchArgs::default());
    }

    #[test]
    fn test_last_lsp_channel_wins() {
        let args = LaunchArgs::parse([
            "--lsp-channel=127.0.0.1:1",
            "--log",
            "--lsp-channel=127.0.0.1:2",
        ]);
        assert_eq!(args.lsp_channel, "127.0.0.1:2");
        assert_eq!(args.kernel_args, vec!["--log"]);
    }

    #[test]
    fn test_other_args_forwarded_in_order() {
        let args = LaunchArgs::parse(["--help", "-v", "--lsp-channel", "x", "--session-mode=console"]);
        assert_eq!(args.lsp_channel, DEFAULT_LSP_CHANNEL);
        assert_eq!(
            args.kernel_args,
            vec!["--help", "-v", "--lsp-channel", "x", "--session-mode=console"]
        );
    }

    #[test]
    fn test_address_is_not_validated() {
        let args = LaunchArgs::parse(["--lsp-channel=not an address"]);
        assert_eq!(args.lsp_channel, "not an address");
        assert!(args.kernel_args.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_kernel_fails_readiness() {
        use std::time::Duration;

        let root = tempfile::TempDir::new().unwrap();
        let spec_dir = root.path().join("kernels").join("silent");
        std::fs::create_dir_all(&spec_dir).unwrap();
        std::fs::write(
            spec_dir.join("kernel.json"),
            json!({ "argv": ["sleep", "30"], "display_name": "Silent", "language": "none" })
                .to_string(),
        )
        .unwrap();

        let runtime_dir = root.path().join("runtime");
        let config = ConsoleConfig {
            kernel_name: "silent".to_string(),
            ready_timeout: Duration::from_millis(300),
            kernel_search_paths: vec![root.path().join("kernels")],
            runtime_dir: Some(runtime_dir.clone()),
            ..Default::default()
        };

        let result = launch(&LaunchArgs::default(), &config).await;
        assert!(matches!(result, Err(KernelError::ReadinessTimeout { .. })));

        // The connection file is cleaned up once the kernel is dropped
        let leftovers: Vec<_> = std::fs::read_dir(&runtime_dir).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
