//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding kernel messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The `<IDS|MSG>` delimiter frame was not found
    #[error("Missing <IDS|MSG> delimiter in multipart message")]
    MissingDelimiter,

    /// Fewer frames than a message requires after the delimiter
    #[error("Incomplete message: expected at least {expected} frames after delimiter, got {actual}")]
    IncompleteMessage { expected: usize, actual: usize },

    /// HMAC signature did not match the message contents
    #[error("Invalid message signature")]
    InvalidSignature,

    /// Connection file asked for a scheme we cannot sign with
    #[error("Unsupported signature scheme: {0}")]
    UnsupportedScheme(String),

    /// A frame that should hold UTF-8 text did not
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
