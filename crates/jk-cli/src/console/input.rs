//! Line input
//!
//! Reading a line blocks on the terminal, so the line source lives on its own
//! thread and the console awaits each line through a channel.

use std::sync::mpsc as std_mpsc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::oneshot;

/// Outcome of reading one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A line was entered (without the trailing newline)
    Line(String),
    /// Ctrl+C at the prompt
    Interrupted,
    /// Ctrl+D / end of input
    Eof,
}

/// Blocking source of input lines
///
/// `record` is false for lines the kernel asked for through `input_request`,
/// which do not belong in the code history. A source is created and used on
/// the reader thread, so it does not need to be `Send` itself.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str, record: bool) -> Result<LineEvent, String>;
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str, record: bool) -> Result<LineEvent, String> {
        match self.readline(prompt) {
            Ok(line) => {
                if record && !line.trim().is_empty() {
                    let _ = self.add_history_entry(line.as_str());
                }
                Ok(LineEvent::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(LineEvent::Interrupted),
            Err(ReadlineError::Eof) => Ok(LineEvent::Eof),
            Err(e) => Err(e.to_string()),
        }
    }
}

struct LineRequest {
    prompt: String,
    record: bool,
    reply: oneshot::Sender<Result<LineEvent, String>>,
}

/// Handle to the line-reading thread
pub struct LineReader {
    requests: std_mpsc::Sender<LineRequest>,
}

impl LineReader {
    /// Start a thread reading from the terminal with rustyline
    pub fn spawn() -> Result<Self> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), String>>();

        let reader = Self::start(move || match DefaultEditor::new() {
            Ok(editor) => {
                let _ = ready_tx.send(Ok(()));
                Some(editor)
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
                None
            }
        })?;

        ready_rx
            .recv()
            .context("Line reader thread exited during startup")?
            .map_err(|e| anyhow!("Failed to initialize line editor: {}", e))?;

        Ok(reader)
    }

    /// Start a thread reading from any line source
    pub fn spawn_with<S: LineSource + Send + 'static>(source: S) -> Result<Self> {
        Self::start(move || Some(source))
    }

    fn start<S, F>(make_source: F) -> Result<Self>
    where
        S: LineSource,
        F: FnOnce() -> Option<S> + Send + 'static,
    {
        let (requests, incoming) = std_mpsc::channel::<LineRequest>();

        thread::Builder::new()
            .name("line-reader".to_string())
            .spawn(move || {
                let Some(mut source) = make_source() else {
                    return;
                };

                for request in incoming {
                    let event = source.read_line(&request.prompt, request.record);
                    let _ = request.reply.send(event);
                }
                tracing::trace!("Line reader thread exiting");
            })
            .context("Failed to start line reader thread")?;

        Ok(Self { requests })
    }

    /// Read a line of code, recording it in the session history
    pub async fn read_line(&self, prompt: &str) -> Result<LineEvent> {
        self.request(prompt, true).await
    }

    /// Read a line for the kernel's `input()`, not recorded in history
    pub async fn read_input(&self, prompt: &str) -> Result<LineEvent> {
        self.request(prompt, false).await
    }

    async fn request(&self, prompt: &str, record: bool) -> Result<LineEvent> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(LineRequest {
                prompt: prompt.to_string(),
                record,
                reply,
            })
            .map_err(|_| anyhow!("Line reader thread has stopped"))?;

        response
            .await
            .context("Line reader thread dropped the request")?
            .map_err(|e| anyhow!("Failed to read input: {}", e))
    }
}
