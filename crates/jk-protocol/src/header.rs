//! Message header

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messaging protocol version we speak
pub const PROTOCOL_VERSION: &str = "5.3";

/// Header identifying a single message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Unique ID of this message
    pub msg_id: String,
    /// Session the sender belongs to
    pub session: String,
    /// Sender's user name
    #[serde(default)]
    pub username: String,
    /// ISO 8601 creation timestamp
    #[serde(default)]
    pub date: String,
    /// Message type, e.g. `execute_request`
    pub msg_type: String,
    /// Protocol version of the sender
    #[serde(default)]
    pub version: String,
}

impl Header {
    /// Create a header with a fresh message ID and the current time
    pub fn new(session: &str, username: &str, msg_type: &str) -> Self {
        Self {
            msg_id: Uuid::new_v4().simple().to_string(),
            session: session.to_string(),
            username: username.to_string(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            msg_type: msg_type.to_string(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}
