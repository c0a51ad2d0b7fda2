//! jk-console: terminal helpers for Jupyter kernels
//!
//! Provides the `run-ark` console launcher and the `get-available-port`
//! utility.

pub mod console;
pub mod launch;
pub mod logging;
pub mod output;
pub mod signals;
