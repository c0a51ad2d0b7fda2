//! Client session
//!
//! A session stamps outgoing messages with a stable session ID and user
//! name, and owns the wire codec used to sign and verify them.

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::header::Header;
use crate::message::{JupyterMessage, MessageType};
use crate::signing::Signer;
use crate::wire::WireCodec;

/// A client's messaging session with one kernel
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    username: String,
    codec: WireCodec,
}

impl Session {
    /// Create a session with a fresh random ID
    pub fn new(signer: Signer, username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            codec: WireCodec::new(signer),
        }
    }

    /// Session ID stamped on every header
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Build a new message of the given type
    pub fn message<C: Serialize>(
        &self,
        msg_type: MessageType,
        content: &C,
    ) -> Result<JupyterMessage, ProtocolError> {
        let header = Header::new(&self.id, &self.username, msg_type.as_str());
        JupyterMessage::new(header, None, content)
    }

    /// Build a message answering `parent` (e.g. an `input_reply`)
    pub fn reply<C: Serialize>(
        &self,
        msg_type: MessageType,
        content: &C,
        parent: &JupyterMessage,
    ) -> Result<JupyterMessage, ProtocolError> {
        let header = Header::new(&self.id, &self.username, msg_type.as_str());
        let mut message = JupyterMessage::new(header, Some(parent.header.clone()), content)?;
        message.identities = parent.identities.clone();
        Ok(message)
    }

    /// Sign and frame a message
    pub fn encode(&self, message: &JupyterMessage) -> Result<Vec<Bytes>, ProtocolError> {
        self.codec.encode(message)
    }

    /// Verify and parse received frames
    pub fn decode(&self, frames: Vec<Bytes>) -> Result<JupyterMessage, ProtocolError> {
        self.codec.decode(frames)
    }
}
