//! get-available-port: print a TCP port that is free on the loopback interface
//!
//! The port is released before this process exits, so another process may
//! claim it first.

use anyhow::{Context, Result};
use clap::Parser;

use jk_console::logging::init_logging;
use jk_core::find_available_port;

#[derive(Parser)]
#[command(name = "get-available-port")]
#[command(author, version, about = "Print a free TCP port on 127.0.0.1")]
struct Cli {}

fn main() {
    let _cli = Cli::parse();
    init_logging();

    match run() {
        Ok(port) => println!("{}", port),
        Err(e) => {
            eprintln!("get-available-port: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<u16> {
    let port = find_available_port().context("Failed to bind a loopback port")?;
    tracing::debug!(port, "Found available port");
    Ok(port)
}
