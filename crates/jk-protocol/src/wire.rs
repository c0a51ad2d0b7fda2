//! Multipart wire framing
//!
//! On the wire a message is a sequence of ZeroMQ frames:
//! - zero or more routing identities
//! - the literal delimiter `<IDS|MSG>`
//! - hex HMAC signature
//! - header, parent header, metadata, content (JSON)
//! - zero or more binary buffers

use bytes::Bytes;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::header::Header;
use crate::message::JupyterMessage;
use crate::signing::Signer;

/// Frame separating routing identities from the message body
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

/// Frames that must follow the delimiter: signature plus four JSON parts
const BODY_FRAMES: usize = 5;

/// Encodes/decodes messages to and from multipart frames
#[derive(Debug, Clone)]
pub struct WireCodec {
    signer: Signer,
}

impl WireCodec {
    /// Create a codec that signs with the given signer
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Serialize and sign a message into frames
    pub fn encode(&self, message: &JupyterMessage) -> Result<Vec<Bytes>, ProtocolError> {
        let header = serde_json::to_vec(&message.header)?;
        let parent = match &message.parent_header {
            Some(parent) => serde_json::to_vec(parent)?,
            None => b"{}".to_vec(),
        };
        let metadata = serde_json::to_vec(&message.metadata)?;
        let content = serde_json::to_vec(&message.content)?;

        let signature = self.signer.sign([
            header.as_slice(),
            parent.as_slice(),
            metadata.as_slice(),
            content.as_slice(),
        ]);

        let mut frames = Vec::with_capacity(message.identities.len() + 6 + message.buffers.len());
        frames.extend(message.identities.iter().cloned());
        frames.push(Bytes::from_static(DELIMITER));
        frames.push(Bytes::from(signature));
        frames.push(Bytes::from(header));
        frames.push(Bytes::from(parent));
        frames.push(Bytes::from(metadata));
        frames.push(Bytes::from(content));
        frames.extend(message.buffers.iter().cloned());

        Ok(frames)
    }

    /// Verify and deserialize frames into a message
    pub fn decode(&self, mut frames: Vec<Bytes>) -> Result<JupyterMessage, ProtocolError> {
        let delimiter = frames
            .iter()
            .position(|f| f.as_ref() == DELIMITER)
            .ok_or(ProtocolError::MissingDelimiter)?;

        let available = frames.len() - delimiter - 1;
        if available < BODY_FRAMES {
            return Err(ProtocolError::IncompleteMessage {
                expected: BODY_FRAMES,
                actual: available,
            });
        }

        let buffers = frames.split_off(delimiter + 1 + BODY_FRAMES);
        let body = frames.split_off(delimiter + 1);
        frames.truncate(delimiter);
        let identities = frames;

        let (signature, header, parent, metadata, content) =
            (&body[0], &body[1], &body[2], &body[3], &body[4]);

        if let Err(e) = self.signer.verify(
            signature,
            [header.as_ref(), parent.as_ref(), metadata.as_ref(), content.as_ref()],
        ) {
            tracing::debug!(
                signature = %String::from_utf8_lossy(signature),
                header = %String::from_utf8_lossy(header),
                "Rejected message with bad signature"
            );
            return Err(e);
        }

        let header: Header = serde_json::from_slice(header)?;
        let parent_header = match serde_json::from_slice::<Value>(parent)? {
            Value::Object(map) if map.is_empty() => None,
            value => Some(serde_json::from_value(value)?),
        };

        Ok(JupyterMessage {
            identities,
            header,
            parent_header,
            metadata: serde_json::from_slice(metadata)?,
            content: serde_json::from_slice(content)?,
            buffers,
        })
    }
}
