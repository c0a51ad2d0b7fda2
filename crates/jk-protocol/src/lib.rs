//! jk-protocol: Jupyter messaging protocol for kernel channels
//!
//! This crate defines the signed multipart message format exchanged with a
//! Jupyter kernel over its ZeroMQ channels (shell, iopub, stdin, control).

pub mod content;
pub mod error;
pub mod header;
pub mod message;
pub mod session;
pub mod signing;
pub mod wire;

pub use error::ProtocolError;
pub use header::{Header, PROTOCOL_VERSION};
pub use message::{JupyterMessage, MessageType};
pub use session::Session;
pub use signing::Signer;
pub use wire::{WireCodec, DELIMITER};
