//! Kernel client
//!
//! Holds the ZeroMQ sockets for one kernel and speaks the request/reply
//! side of the messaging protocol:
//! - shell (DEALER): execution, completeness, introspection, comms
//! - iopub (SUB): broadcast output and status
//! - stdin (DEALER): kernel-initiated input requests
//! - control (DEALER): interrupt and shutdown
//!
//! Shell and stdin share the session ID as their socket identity, so the
//! kernel can route `input_request`s back to the frontend that sent the code.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use zeromq::{DealerSocket, Socket, SocketOptions, SocketRecv, SocketSend, SubSocket, ZmqMessage};

use jk_protocol::content::{
    CommOpen, ExecuteRequest, InputReply, InterruptRequest, IsCompleteReply, IsCompleteRequest,
    IsCompleteStatus, KernelInfoReply, KernelInfoRequest, ShutdownRequest,
};
use jk_protocol::{JupyterMessage, MessageType, Session, Signer};

use crate::connection::ConnectionInfo;
use crate::error::KernelError;

/// How long a single `kernel_info_request` attempt waits for its reply
const KERNEL_INFO_ATTEMPT: Duration = Duration::from_secs(1);

/// Quiet period that ends the iopub flush after readiness
const IOPUB_FLUSH_QUIET: Duration = Duration::from_millis(200);

/// Delay between attempts to reach a kernel that is not listening yet
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// A message received on one of the client's channels
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    Shell(JupyterMessage),
    IoPub(JupyterMessage),
    Stdin(JupyterMessage),
}

/// Connected client for a single kernel
pub struct KernelClient {
    session: Session,
    shell: DealerSocket,
    iopub: SubSocket,
    stdin: DealerSocket,
    control: DealerSocket,
}

impl KernelClient {
    /// Open all channels described by a connection file
    ///
    /// Sockets are retried until the kernel is listening, so callers should
    /// bound this with a timeout.
    pub async fn connect(info: &ConnectionInfo) -> Result<Self, KernelError> {
        let signer = Signer::new(&info.signature_scheme, info.key.as_bytes())?;
        let session = Session::new(signer, whoami::username());

        let mut shell = DealerSocket::with_options(identity_options(&session)?);
        let mut stdin = DealerSocket::with_options(identity_options(&session)?);
        let mut control = DealerSocket::new();
        let mut iopub = SubSocket::new();

        connect_socket(&mut shell, &info.endpoint(info.shell_port)).await;
        connect_socket(&mut iopub, &info.endpoint(info.iopub_port)).await;
        iopub.subscribe("").await?;
        connect_socket(&mut stdin, &info.endpoint(info.stdin_port)).await;
        connect_socket(&mut control, &info.endpoint(info.control_port)).await;

        tracing::debug!(session = %session.id(), "Kernel channels connected");

        Ok(Self {
            session,
            shell,
            iopub,
            stdin,
            control,
        })
    }

    /// The messaging session used for every outgoing message
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Block until the kernel answers `kernel_info_request`
    ///
    /// Re-sends the request every second until a reply arrives, then flushes
    /// startup traffic from iopub. Unbounded; wrap it in a timeout.
    pub async fn wait_for_ready(&mut self) -> Result<KernelInfoReply, KernelError> {
        loop {
            let request = self
                .send_shell(MessageType::KernelInfoRequest, &KernelInfoRequest::default())
                .await?;

            let attempt = tokio::time::timeout(
                KERNEL_INFO_ATTEMPT,
                self.recv_shell_reply(&request.header.msg_id),
            )
            .await;

            match attempt {
                Ok(reply) => {
                    let reply = reply?;
                    if reply.message_type() == Some(MessageType::KernelInfoReply) {
                        let info: KernelInfoReply = reply.parse_content()?;
                        tracing::info!(
                            implementation = %info.implementation,
                            language = %info.language_info.name,
                            "Kernel is ready"
                        );
                        self.flush_iopub(IOPUB_FLUSH_QUIET).await?;
                        return Ok(info);
                    }
                }
                Err(_) => tracing::debug!("No kernel_info_reply yet, retrying"),
            }
        }
    }

    /// Send `comm_open` on shell without waiting for any response
    pub async fn open_comm(
        &mut self,
        target_name: &str,
        comm_id: &str,
        data: Value,
    ) -> Result<(), KernelError> {
        let content = CommOpen {
            comm_id: comm_id.to_string(),
            target_name: target_name.to_string(),
            data,
        };
        self.send_shell(MessageType::CommOpen, &content).await?;
        tracing::debug!(target_name, comm_id, "Sent comm_open");
        Ok(())
    }

    /// Send `execute_request`, returning the request's `msg_id`
    pub async fn execute(&mut self, code: &str) -> Result<String, KernelError> {
        let request = self
            .send_shell(MessageType::ExecuteRequest, &ExecuteRequest::interactive(code))
            .await?;
        Ok(request.header.msg_id)
    }

    /// Ask whether `code` is a complete statement
    ///
    /// Returns `Unknown` if the kernel does not answer within `timeout`.
    pub async fn is_complete(
        &mut self,
        code: &str,
        timeout: Duration,
    ) -> Result<IsCompleteReply, KernelError> {
        let request = self
            .send_shell(
                MessageType::IsCompleteRequest,
                &IsCompleteRequest {
                    code: code.to_string(),
                },
            )
            .await?;

        match tokio::time::timeout(timeout, self.recv_shell_reply(&request.header.msg_id)).await {
            Ok(reply) => Ok(reply?.parse_content()?),
            Err(_) => {
                tracing::debug!("is_complete_request timed out");
                Ok(IsCompleteReply {
                    status: IsCompleteStatus::Unknown,
                    indent: String::new(),
                })
            }
        }
    }

    /// Answer a kernel's `input_request`
    pub async fn input_reply(
        &mut self,
        value: String,
        request: &JupyterMessage,
    ) -> Result<(), KernelError> {
        let reply = self
            .session
            .reply(MessageType::InputReply, &InputReply { value }, request)?;
        let frames = self.session.encode(&reply)?;
        send_frames(&mut self.stdin, frames).await
    }

    /// Send `interrupt_request` on control
    pub async fn interrupt_request(&mut self) -> Result<(), KernelError> {
        let message = self
            .session
            .message(MessageType::InterruptRequest, &InterruptRequest::default())?;
        let frames = self.session.encode(&message)?;
        send_frames(&mut self.control, frames).await
    }

    /// Send `shutdown_request` on control
    pub async fn shutdown_request(&mut self) -> Result<(), KernelError> {
        let message = self
            .session
            .message(MessageType::ShutdownRequest, &ShutdownRequest { restart: false })?;
        let frames = self.session.encode(&message)?;
        send_frames(&mut self.control, frames).await
    }

    /// Receive the next message on shell
    pub async fn recv_shell(&mut self) -> Result<JupyterMessage, KernelError> {
        recv_message(&mut self.shell, &self.session, "shell").await
    }

    /// Receive the next message on iopub
    pub async fn recv_iopub(&mut self) -> Result<JupyterMessage, KernelError> {
        recv_message(&mut self.iopub, &self.session, "iopub").await
    }

    /// Receive whichever of shell, iopub, or stdin produces a message first
    pub async fn next_message(&mut self) -> Result<ChannelMessage, KernelError> {
        tokio::select! {
            msg = recv_message(&mut self.iopub, &self.session, "iopub") => Ok(ChannelMessage::IoPub(msg?)),
            msg = recv_message(&mut self.stdin, &self.session, "stdin") => Ok(ChannelMessage::Stdin(msg?)),
            msg = recv_message(&mut self.shell, &self.session, "shell") => Ok(ChannelMessage::Shell(msg?)),
        }
    }

    /// Discard iopub messages until none arrives for `quiet`
    pub async fn flush_iopub(&mut self, quiet: Duration) -> Result<usize, KernelError> {
        let mut flushed = 0;
        while let Ok(msg) = tokio::time::timeout(quiet, self.recv_iopub()).await {
            let msg = msg?;
            tracing::trace!(msg_type = %msg.header.msg_type, "Flushed iopub message");
            flushed += 1;
        }
        Ok(flushed)
    }

    async fn send_shell<C: Serialize>(
        &mut self,
        msg_type: MessageType,
        content: &C,
    ) -> Result<JupyterMessage, KernelError> {
        let message = self.session.message(msg_type, content)?;
        let frames = self.session.encode(&message)?;
        tracing::debug!(msg_type = %msg_type, msg_id = %message.header.msg_id, "shell <-");
        send_frames(&mut self.shell, frames).await?;
        Ok(message)
    }

    /// Read shell messages until one answers `msg_id`, dropping stale replies
    async fn recv_shell_reply(&mut self, msg_id: &str) -> Result<JupyterMessage, KernelError> {
        loop {
            let msg = self.recv_shell().await?;
            if msg.is_reply_to(msg_id) {
                return Ok(msg);
            }
            tracing::debug!(
                msg_type = %msg.header.msg_type,
                "Ignoring shell message for another request"
            );
        }
    }
}

fn identity_options(session: &Session) -> Result<SocketOptions, KernelError> {
    let identity = zeromq::util::PeerIdentity::try_from(session.id().as_bytes().to_vec())
        .map_err(|e| KernelError::Identity(e.to_string()))?;
    let mut options = SocketOptions::default();
    options.peer_identity(identity);
    Ok(options)
}

/// Connect a socket, retrying while the kernel is not yet listening
async fn connect_socket<S: Socket>(socket: &mut S, endpoint: &str) {
    loop {
        match socket.connect(endpoint).await {
            Ok(()) => {
                tracing::debug!("Connected to {}", endpoint);
                return;
            }
            Err(e) => {
                tracing::trace!("Connecting to {} failed ({}), retrying", endpoint, e);
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
}

async fn send_frames<S: SocketSend>(socket: &mut S, frames: Vec<Bytes>) -> Result<(), KernelError> {
    let mut frames = frames.into_iter();
    let Some(first) = frames.next() else {
        return Ok(());
    };

    let mut message = ZmqMessage::from(first);
    for frame in frames {
        message.push_back(frame);
    }
    socket.send(message).await?;
    Ok(())
}

/// Receive and verify one message, skipping frames that fail to decode
async fn recv_message<S: SocketRecv>(
    socket: &mut S,
    session: &Session,
    channel: &'static str,
) -> Result<JupyterMessage, KernelError> {
    loop {
        let frames = socket.recv().await?.into_vec();
        match session.decode(frames) {
            Ok(msg) => {
                tracing::trace!(channel, msg_type = %msg.header.msg_type, "-> received");
                return Ok(msg);
            }
            Err(e) => tracing::warn!(channel, "Dropping undecodable message: {}", e),
        }
    }
}
