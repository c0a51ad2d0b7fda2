//! HMAC message signing
//!
//! Every message carries a hex HMAC over its four JSON frames
//! (header, parent header, metadata, content), keyed with the `key`
//! from the kernel's connection file. An empty key disables signing.

use ring::hmac;

use crate::error::ProtocolError;

/// The only scheme kernels are launched with
pub const HMAC_SHA256: &str = "hmac-sha256";

/// Signs and verifies message frames
#[derive(Clone)]
pub struct Signer {
    key: Option<hmac::Key>,
}

impl Signer {
    /// Create a signer for a connection file's `signature_scheme` and `key`
    pub fn new(scheme: &str, key: &[u8]) -> Result<Self, ProtocolError> {
        if scheme != HMAC_SHA256 {
            return Err(ProtocolError::UnsupportedScheme(scheme.to_string()));
        }
        if key.is_empty() {
            return Ok(Self::unsigned());
        }
        Ok(Self {
            key: Some(hmac::Key::new(hmac::HMAC_SHA256, key)),
        })
    }

    /// A signer that produces empty signatures and accepts anything
    pub fn unsigned() -> Self {
        Self { key: None }
    }

    /// Whether messages are actually signed
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Sign the four JSON frames of a message, returning a lowercase hex digest
    pub fn sign(&self, parts: [&[u8]; 4]) -> String {
        let Some(key) = &self.key else {
            return String::new();
        };

        let mut ctx = hmac::Context::with_key(key);
        for part in parts {
            ctx.update(part);
        }
        hex::encode(ctx.sign().as_ref())
    }

    /// Verify a hex signature against the four JSON frames
    pub fn verify(&self, signature: &[u8], parts: [&[u8]; 4]) -> Result<(), ProtocolError> {
        let Some(key) = &self.key else {
            return Ok(());
        };

        let tag = hex::decode(signature).map_err(|_| ProtocolError::InvalidSignature)?;
        let data = parts.concat();
        hmac::verify(key, &data, &tag).map_err(|_| ProtocolError::InvalidSignature)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
