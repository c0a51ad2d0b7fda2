//! Message types for the Jupyter messaging protocol
//!
//! A message is a header, an optional parent header linking it to the
//! request it answers, free-form metadata, a typed content body, and any
//! binary buffers. Messages are framed for the wire by [`crate::wire`].
//!
//! # Message Flow
//!
//! Typical sequence for one console input:
//!
//! 1. Client sends `is_complete_request` on shell, kernel answers `is_complete_reply`
//! 2. Client sends `execute_request` on shell
//! 3. Kernel publishes `status: busy`, `execute_input`, then `stream` /
//!    `execute_result` / `display_data` / `error` on iopub
//! 4. If the code reads from stdin, kernel sends `input_request` on stdin and
//!    the client answers with `input_reply`
//! 5. Kernel publishes `status: idle` and sends `execute_reply` on shell

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::header::Header;

/// Message type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Ask the kernel to describe itself (used as the readiness check)
    KernelInfoRequest,
    /// Kernel description
    KernelInfoReply,
    /// Run code
    ExecuteRequest,
    /// Outcome of an `execute_request`
    ExecuteReply,
    /// Ask whether a piece of input is a complete statement
    IsCompleteRequest,
    /// Completeness verdict
    IsCompleteReply,
    /// Kernel asks the frontend for a line of input
    InputRequest,
    /// Frontend answers an `input_request`
    InputReply,
    /// Interrupt running code (message-mode kernels)
    InterruptRequest,
    /// Acknowledgment of an interrupt
    InterruptReply,
    /// Ask the kernel to exit
    ShutdownRequest,
    /// Acknowledgment of a shutdown
    ShutdownReply,
    /// Open a comm (custom bidirectional channel)
    CommOpen,
    /// Message on an open comm
    CommMsg,
    /// Close a comm
    CommClose,
    /// Kernel execution state (busy / idle / starting)
    Status,
    /// stdout / stderr text
    Stream,
    /// Echo of the code being executed
    ExecuteInput,
    /// Value of the last expression
    ExecuteResult,
    /// Rich display output
    DisplayData,
    /// Update of an earlier display
    UpdateDisplayData,
    /// Clear the output area
    ClearOutput,
    /// Execution raised an error
    Error,
}

impl MessageType {
    /// Wire name of the message type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KernelInfoRequest => "kernel_info_request",
            Self::KernelInfoReply => "kernel_info_reply",
            Self::ExecuteRequest => "execute_request",
            Self::ExecuteReply => "execute_reply",
            Self::IsCompleteRequest => "is_complete_request",
            Self::IsCompleteReply => "is_complete_reply",
            Self::InputRequest => "input_request",
            Self::InputReply => "input_reply",
            Self::InterruptRequest => "interrupt_request",
            Self::InterruptReply => "interrupt_reply",
            Self::ShutdownRequest => "shutdown_request",
            Self::ShutdownReply => "shutdown_reply",
            Self::CommOpen => "comm_open",
            Self::CommMsg => "comm_msg",
            Self::CommClose => "comm_close",
            Self::Status => "status",
            Self::Stream => "stream",
            Self::ExecuteInput => "execute_input",
            Self::ExecuteResult => "execute_result",
            Self::DisplayData => "display_data",
            Self::UpdateDisplayData => "update_display_data",
            Self::ClearOutput => "clear_output",
            Self::Error => "error",
        }
    }

    /// Parse a wire name; unknown types yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        let ty = match value {
            "kernel_info_request" => Self::KernelInfoRequest,
            "kernel_info_reply" => Self::KernelInfoReply,
            "execute_request" => Self::ExecuteRequest,
            "execute_reply" => Self::ExecuteReply,
            "is_complete_request" => Self::IsCompleteRequest,
            "is_complete_reply" => Self::IsCompleteReply,
            "input_request" => Self::InputRequest,
            "input_reply" => Self::InputReply,
            "interrupt_request" => Self::InterruptRequest,
            "interrupt_reply" => Self::InterruptReply,
            "shutdown_request" => Self::ShutdownRequest,
            "shutdown_reply" => Self::ShutdownReply,
            "comm_open" => Self::CommOpen,
            "comm_msg" => Self::CommMsg,
            "comm_close" => Self::CommClose,
            "status" => Self::Status,
            "stream" => Self::Stream,
            "execute_input" => Self::ExecuteInput,
            "execute_result" => Self::ExecuteResult,
            "display_data" => Self::DisplayData,
            "update_display_data" => Self::UpdateDisplayData,
            "clear_output" => Self::ClearOutput,
            "error" => Self::Error,
            _ => return None,
        };
        Some(ty)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct JupyterMessage {
    /// ZeroMQ routing identities preceding the delimiter
    pub identities: Vec<Bytes>,
    /// This message's header
    pub header: Header,
    /// Header of the request this message answers, if any
    pub parent_header: Option<Header>,
    /// Free-form metadata
    pub metadata: Value,
    /// Type-specific body
    pub content: Value,
    /// Extra binary buffers
    pub buffers: Vec<Bytes>,
}

impl JupyterMessage {
    /// Build a message from a header and serializable content
    pub fn new<C: Serialize>(
        header: Header,
        parent_header: Option<Header>,
        content: &C,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            identities: Vec::new(),
            header,
            parent_header,
            metadata: Value::Object(Default::default()),
            content: serde_json::to_value(content)?,
            buffers: Vec::new(),
        })
    }

    /// The message's type, if it is one we know about
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::parse(&self.header.msg_type)
    }

    /// The `msg_id` of the parent request, if there is one
    pub fn parent_msg_id(&self) -> Option<&str> {
        self.parent_header.as_ref().map(|h| h.msg_id.as_str())
    }

    /// Whether this message answers the request with the given ID
    pub fn is_reply_to(&self, msg_id: &str) -> bool {
        self.parent_msg_id() == Some(msg_id)
    }

    /// Deserialize the content body into a typed struct
    pub fn parse_content<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.content.clone())?)
    }
}
