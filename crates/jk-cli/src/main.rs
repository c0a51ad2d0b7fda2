//! run-ark: interactive console for the Ark R kernel
//!
//! Usage: `run-ark [--lsp-channel=<host:port>] [kernel args...]`
//!
//! Arguments other than `--lsp-channel=` are passed to the kernel as-is.

use anyhow::{anyhow, bail, Context, Result};

use jk_console::console::{Console, PromptStyle};
use jk_console::launch::{launch, LaunchArgs, Launched};
use jk_console::logging::init_logging;
use jk_console::output::print_error;
use jk_console::signals::TerminationSignals;
use jk_core::ConsoleConfig;

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = LaunchArgs::parse(std::env::args().skip(1));
    let config = ConsoleConfig::load().context("Failed to load configuration")?;
    let mut signals = TerminationSignals::install().context("Failed to install signal handlers")?;

    // Dropping an unfinished launch kills the kernel and removes its connection file
    let Launched {
        mut kernel,
        mut client,
        info,
    } = tokio::select! {
        launched = launch(&args, &config) => launched
            .with_context(|| format!("Failed to start kernel '{}'", config.kernel_name))?,
        signal = signals.startup() => bail!("Received {} while starting kernel '{}'", signal, config.kernel_name),
    };

    if !info.banner.is_empty() {
        println!("{}", info.banner.trim_end());
    }

    let mut console = Console::new(PromptStyle::r_like())?;
    let result = tokio::select! {
        result = console.interact(&mut kernel, &mut client) => result,
        signal = signals.session() => Err(anyhow!("Received {}, shutting down", signal)),
    };

    kernel
        .shutdown(&mut client, config.shutdown_timeout)
        .await
        .context("Failed to shut down kernel")?;

    result
}
