//! Interactive console
//!
//! A single cooperative read-eval-print loop bound to one kernel client.
//! It suspends while waiting for the user's next line and while waiting for
//! the kernel to finish each execution.

mod input;
mod prompt;

pub use input::{LineEvent, LineReader, LineSource};
pub use prompt::PromptStyle;

use std::time::Duration;

use anyhow::Result;
use jk_core::{ChannelMessage, KernelClient, KernelManager};
use jk_protocol::content::{
    text_plain, DisplayData, ErrorContent, ExecuteReply, ExecuteResult, ExecutionState,
    InputRequest, IsCompleteStatus, Status, Stream, StreamName,
};
use jk_protocol::{JupyterMessage, MessageType};

use crate::output::{format_error, format_result, print_error, print_warning, write_stream};

/// How long to wait for `is_complete_reply` before treating input as complete
const IS_COMPLETE_TIMEOUT: Duration = Duration::from_secs(1);

/// How often to check that the kernel process is still running during execution
const LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// What an iopub message means for the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IopubAction {
    /// Write text to stdout
    Stdout(String),
    /// Write text to stderr
    Stderr(String),
    /// Clear the current output line
    ClearLine,
    /// Kernel finished the request
    Idle,
    /// Nothing to show
    Ignore,
}

/// Decide how to render one iopub message
pub fn iopub_action(msg: &JupyterMessage, style: &PromptStyle) -> Result<IopubAction> {
    let Some(msg_type) = msg.message_type() else {
        tracing::debug!(msg_type = %msg.header.msg_type, "Ignoring unknown iopub message");
        return Ok(IopubAction::Ignore);
    };

    let action = match msg_type {
        MessageType::Status => {
            let status: Status = msg.parse_content()?;
            if status.execution_state == ExecutionState::Idle {
                IopubAction::Idle
            } else {
                IopubAction::Ignore
            }
        }
        MessageType::Stream => {
            let stream: Stream = msg.parse_content()?;
            match stream.name {
                StreamName::Stdout => IopubAction::Stdout(stream.text),
                StreamName::Stderr => IopubAction::Stderr(stream.text),
            }
        }
        MessageType::ExecuteResult => {
            let result: ExecuteResult = msg.parse_content()?;
            match text_plain(&result.data) {
                Some(text) => {
                    let prefix = style.render_out_prompt(result.execution_count.unwrap_or(0));
                    IopubAction::Stdout(format!("{}\n", format_result(&prefix, text)))
                }
                None => IopubAction::Ignore,
            }
        }
        MessageType::DisplayData | MessageType::UpdateDisplayData => {
            let display: DisplayData = msg.parse_content()?;
            match text_plain(&display.data) {
                Some(text) => IopubAction::Stdout(format!("{}\n", text)),
                None => IopubAction::Ignore,
            }
        }
        MessageType::Error => {
            let error: ErrorContent = msg.parse_content()?;
            IopubAction::Stderr(format!("{}\n", format_error(&error)))
        }
        MessageType::ClearOutput => IopubAction::ClearLine,
        _ => IopubAction::Ignore,
    };
    Ok(action)
}

/// Result of running one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Exit,
}

/// Interactive console bound to a kernel
pub struct Console {
    style: PromptStyle,
    reader: LineReader,
    execution_count: u32,
}

impl Console {
    /// Create a console reading from the terminal
    pub fn new(style: PromptStyle) -> Result<Self> {
        Ok(Self::with_reader(style, LineReader::spawn()?))
    }

    /// Create a console reading lines from `reader`
    pub fn with_reader(style: PromptStyle, reader: LineReader) -> Self {
        Self {
            style,
            reader,
            execution_count: 1,
        }
    }

    /// Run the loop until end of input, an exit request, or kernel death
    pub async fn interact(
        &mut self,
        kernel: &mut KernelManager,
        client: &mut KernelClient,
    ) -> Result<()> {
        loop {
            let Some(code) = self.read_cell(kernel, client).await? else {
                break;
            };

            if code.trim().is_empty() {
                continue;
            }

            if self.execute(kernel, client, &code).await? == Outcome::Exit {
                break;
            }
        }

        tracing::info!("Console loop finished");
        Ok(())
    }

    /// Read one complete cell, prompting for continuation lines as needed
    ///
    /// Returns `None` on end of input or when the kernel has gone away.
    async fn read_cell(
        &mut self,
        kernel: &mut KernelManager,
        client: &mut KernelClient,
    ) -> Result<Option<String>> {
        let primary = self.style.render_prompt(self.execution_count);
        let mut prompt = primary.clone();
        let mut lines: Vec<String> = Vec::new();

        loop {
            match self.reader.read_line(&prompt).await? {
                LineEvent::Line(line) => lines.push(line),
                LineEvent::Interrupted => {
                    lines.clear();
                    prompt = primary.clone();
                    continue;
                }
                LineEvent::Eof => return Ok(None),
            }

            let code = lines.join("\n");
            if code.trim().is_empty() {
                return Ok(Some(code));
            }

            if !kernel.is_alive() {
                print_error("Kernel died, exiting");
                return Ok(None);
            }

            let reply = client.is_complete(&code, IS_COMPLETE_TIMEOUT).await?;
            if reply.status != IsCompleteStatus::Incomplete {
                return Ok(Some(code));
            }
            prompt = self.style.render_continuation(primary.chars().count());
        }
    }

    /// Execute a cell and render its output until the kernel is idle again
    async fn execute(
        &mut self,
        kernel: &mut KernelManager,
        client: &mut KernelClient,
        code: &str,
    ) -> Result<Outcome> {
        let msg_id = client.execute(code).await?;
        tracing::debug!(%msg_id, "Sent execute_request");

        let mut idle = false;
        let mut replied = false;
        let mut reply: Option<ExecuteReply> = None;
        let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);

        while !(idle && replied) {
            tokio::select! {
                msg = client.next_message() => match msg? {
                    ChannelMessage::IoPub(msg) if msg.is_reply_to(&msg_id) => {
                        match iopub_action(&msg, &self.style) {
                            Ok(IopubAction::Stdout(text)) => write_stream(&text, false),
                            Ok(IopubAction::Stderr(text)) => write_stream(&text, true),
                            Ok(IopubAction::ClearLine) => write_stream("\x1b[2K\r", false),
                            Ok(IopubAction::Idle) => idle = true,
                            Ok(IopubAction::Ignore) => {}
                            Err(e) => tracing::warn!(
                                msg_type = %msg.header.msg_type,
                                "Skipping malformed iopub message: {}", e
                            ),
                        }
                    }
                    ChannelMessage::IoPub(msg) => {
                        tracing::trace!(msg_type = %msg.header.msg_type, "Ignoring iopub message for another request");
                    }
                    ChannelMessage::Stdin(msg) => self.answer_input(client, &msg).await?,
                    ChannelMessage::Shell(msg) if msg.is_reply_to(&msg_id) => {
                        replied = true;
                        match msg.parse_content::<ExecuteReply>() {
                            Ok(content) => reply = Some(content),
                            Err(e) => tracing::warn!("Skipping malformed execute_reply: {}", e),
                        }
                    }
                    ChannelMessage::Shell(msg) => {
                        tracing::debug!(msg_type = %msg.header.msg_type, "Ignoring stale shell reply");
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::debug!("Interrupting kernel");
                    if let Err(e) = kernel.interrupt(client).await {
                        print_warning(&format!("Failed to interrupt kernel: {}", e));
                    }
                }
                _ = liveness.tick() => {
                    if !kernel.is_alive() {
                        print_error("Kernel died, exiting");
                        return Ok(Outcome::Exit);
                    }
                }
            }
        }

        let Some(reply) = reply else {
            return Ok(Outcome::Continue);
        };
        if let Some(count) = reply.execution_count {
            self.execution_count = count + 1;
        }
        if reply.asks_exit() {
            tracing::info!("Kernel asked the console to exit");
            return Ok(Outcome::Exit);
        }
        Ok(Outcome::Continue)
    }

    /// Prompt the user on behalf of the kernel and send the answer back
    async fn answer_input(&mut self, client: &mut KernelClient, msg: &JupyterMessage) -> Result<()> {
        if msg.message_type() != Some(MessageType::InputRequest) {
            tracing::debug!(msg_type = %msg.header.msg_type, "Ignoring stdin message");
            return Ok(());
        }

        // Any input_request still needs an answer to unblock the kernel
        let prompt = match msg.parse_content::<InputRequest>() {
            Ok(request) => request.prompt,
            Err(e) => {
                tracing::warn!("Malformed input_request: {}", e);
                String::new()
            }
        };
        let value = match self.reader.read_input(&prompt).await? {
            LineEvent::Line(line) => line,
            LineEvent::Interrupted | LineEvent::Eof => String::new(),
        };
        client.input_reply(value, msg).await?;
        Ok(())
    }
}
