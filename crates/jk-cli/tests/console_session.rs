//! Console loop tests
//!
//! Drives `Console` with scripted input against an in-process fake kernel
//! listening on the ZeroMQ ports from the connection file. The kernel
//! process itself is a plain `sleep`.

#![cfg(unix)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use zeromq::{PubSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use jk_console::console::{Console, LineEvent, LineReader, LineSource, PromptStyle};
use jk_core::{ConnectionInfo, KernelManager, KernelSpec};
use jk_protocol::{JupyterMessage, MessageType, Session, Signer};

/// Input typed by the "user", recording every prompt shown
struct ScriptedInput {
    lines: VecDeque<LineEvent>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str, _record: bool) -> Result<LineEvent, String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.lines.pop_front().unwrap_or(LineEvent::Eof))
    }
}

fn scripted(lines: &[&str]) -> (LineReader, Arc<Mutex<Vec<String>>>) {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let input = ScriptedInput {
        lines: lines.iter().map(|l| LineEvent::Line(l.to_string())).collect(),
        prompts: Arc::clone(&prompts),
    };
    (LineReader::spawn_with(input).unwrap(), prompts)
}

fn start_kernel(root: &Path, argv: Value) -> KernelManager {
    let dir = root.join("kernels").join("fake");
    std::fs::create_dir_all(&dir).unwrap();
    let spec = json!({ "argv": argv, "display_name": "Fake", "language": "R" });
    std::fs::write(dir.join("kernel.json"), spec.to_string()).unwrap();
    let spec = KernelSpec::from_dir("fake", &dir).unwrap();
    KernelManager::start_with_spec(spec, &[], &root.join("runtime")).unwrap()
}

fn to_zmq(session: &Session, message: &JupyterMessage) -> ZmqMessage {
    let mut frames = session.encode(message).unwrap().into_iter();
    let mut zmq = ZmqMessage::from(frames.next().unwrap());
    for frame in frames {
        zmq.push_back(frame);
    }
    zmq
}

/// Minimal R-flavoured kernel
///
/// - `is_complete` reports unbalanced braces as incomplete
/// - `readline()` asks for input on stdin and echoes it
/// - `quit()` replies with an `ask_exit` payload
/// - `hang()` never finishes
///
/// Every execution publishes idle before its `execute_reply`, with a gap.
struct FakeKernel {
    session: Session,
    shell: RouterSocket,
    iopub: PubSocket,
    stdin: RouterSocket,
    _control: RouterSocket,
    seen: mpsc::UnboundedSender<JupyterMessage>,
    execution_count: u32,
}

impl FakeKernel {
    async fn bind(info: &ConnectionInfo, seen: mpsc::UnboundedSender<JupyterMessage>) -> Self {
        let mut shell = RouterSocket::new();
        shell.bind(&info.endpoint(info.shell_port)).await.unwrap();
        let mut iopub = PubSocket::new();
        iopub.bind(&info.endpoint(info.iopub_port)).await.unwrap();
        let mut stdin = RouterSocket::new();
        stdin.bind(&info.endpoint(info.stdin_port)).await.unwrap();
        let mut control = RouterSocket::new();
        control.bind(&info.endpoint(info.control_port)).await.unwrap();

        Self {
            session: Session::new(
                Signer::new(&info.signature_scheme, info.key.as_bytes()).unwrap(),
                "kernel",
            ),
            shell,
            iopub,
            stdin,
            _control: control,
            seen,
            execution_count: 0,
        }
    }

    async fn serve(mut self) {
        loop {
            let Ok(frames) = self.shell.recv().await else {
                return;
            };
            let request = self.session.decode(frames.into_vec()).unwrap();
            let _ = self.seen.send(request.clone());

            match request.message_type() {
                Some(MessageType::KernelInfoRequest) => {
                    let content = json!({
                        "status": "ok",
                        "protocol_version": "5.3",
                        "implementation": "fake",
                        "language_info": {"name": "R"},
                        "banner": ""
                    });
                    self.reply(MessageType::KernelInfoReply, content, &request).await;
                }
                Some(MessageType::IsCompleteRequest) => {
                    let code = request.content["code"].as_str().unwrap_or_default();
                    let status = if code.matches('{').count() > code.matches('}').count() {
                        "incomplete"
                    } else {
                        "complete"
                    };
                    let content = json!({"status": status, "indent": ""});
                    self.reply(MessageType::IsCompleteReply, content, &request).await;
                }
                Some(MessageType::ExecuteRequest) => self.execute(&request).await,
                _ => {}
            }
        }
    }

    async fn execute(&mut self, request: &JupyterMessage) {
        self.execution_count += 1;
        let code = request.content["code"].as_str().unwrap_or_default().to_string();

        self.publish(MessageType::Status, json!({"execution_state": "busy"}), request)
            .await;
        if code == "hang()" {
            return;
        }
        // Not a valid execution state; the console must shrug it off
        self.publish(MessageType::Status, json!({"execution_state": "confused"}), request)
            .await;

        if code == "readline()" {
            let input_request = self
                .session
                .reply(
                    MessageType::InputRequest,
                    &json!({"prompt": "Name: ", "password": false}),
                    request,
                )
                .unwrap();
            self.stdin
                .send(to_zmq(&self.session, &input_request))
                .await
                .unwrap();

            let frames = self.stdin.recv().await.unwrap();
            let input_reply = self.session.decode(frames.into_vec()).unwrap();
            let value = input_reply.content["value"].as_str().unwrap_or_default().to_string();
            let _ = self.seen.send(input_reply);

            let text = format!("Hello, {}\n", value);
            self.publish(MessageType::Stream, json!({"name": "stdout", "text": text}), request)
                .await;
        }

        self.publish(MessageType::Status, json!({"execution_state": "idle"}), request)
            .await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let payload = if code == "quit()" {
            json!([{"source": "ask_exit", "keepkernel": false}])
        } else {
            json!([])
        };
        let content = json!({
            "status": "ok",
            "execution_count": self.execution_count,
            "payload": payload
        });
        self.reply(MessageType::ExecuteReply, content, request).await;
    }

    async fn reply(&mut self, msg_type: MessageType, content: Value, request: &JupyterMessage) {
        let reply = self.session.reply(msg_type, &content, request).unwrap();
        self.shell.send(to_zmq(&self.session, &reply)).await.unwrap();
    }

    async fn publish(&mut self, msg_type: MessageType, content: Value, parent: &JupyterMessage) {
        let mut message = self.session.reply(msg_type, &content, parent).unwrap();
        message.identities.clear();
        self.iopub.send(to_zmq(&self.session, &message)).await.unwrap();
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<JupyterMessage>) -> Vec<JupyterMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

fn codes(messages: &[JupyterMessage], msg_type: MessageType) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.message_type() == Some(msg_type))
        .map(|m| m.content["code"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_console_session_with_continuation_input_and_exit() {
    let root = TempDir::new().unwrap();
    let mut kernel = start_kernel(root.path(), json!(["sleep", "30"]));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let fake = FakeKernel::bind(kernel.connection_info(), tx).await;
    tokio::spawn(fake.serve());

    let (mut client, _) = kernel.connect_ready(Duration::from_secs(10)).await.unwrap();

    let (reader, prompts) = scripted(&["f <- function() {", "}", "readline()", "Ada", "quit()"]);
    let mut console = Console::with_reader(PromptStyle::default(), reader);

    tokio::time::timeout(Duration::from_secs(20), console.interact(&mut kernel, &mut client))
        .await
        .expect("console should finish on ask_exit")
        .unwrap();

    // Numbered prompts advance only once each execute_reply has arrived, and
    // nothing is read after quit()
    assert_eq!(
        *prompts.lock().unwrap(),
        vec!["In [1]: ", "   ...: ", "In [2]: ", "Name: ", "In [3]: "]
    );

    let seen = drain(&mut rx);
    assert_eq!(
        codes(&seen, MessageType::IsCompleteRequest),
        vec!["f <- function() {", "f <- function() {\n}", "readline()", "quit()"]
    );
    assert_eq!(
        codes(&seen, MessageType::ExecuteRequest),
        vec!["f <- function() {\n}", "readline()", "quit()"]
    );

    let input_replies: Vec<_> = seen
        .iter()
        .filter(|m| m.message_type() == Some(MessageType::InputReply))
        .collect();
    assert_eq!(input_replies.len(), 1);
    assert_eq!(input_replies[0].content["value"], "Ada");
}

#[tokio::test]
async fn test_console_skips_empty_input() {
    let root = TempDir::new().unwrap();
    let mut kernel = start_kernel(root.path(), json!(["sleep", "30"]));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let fake = FakeKernel::bind(kernel.connection_info(), tx).await;
    tokio::spawn(fake.serve());

    let (mut client, _) = kernel.connect_ready(Duration::from_secs(10)).await.unwrap();
    let _ = drain(&mut rx);

    let (reader, prompts) = scripted(&["", "   "]);
    let mut console = Console::with_reader(PromptStyle::r_like(), reader);

    tokio::time::timeout(Duration::from_secs(10), console.interact(&mut kernel, &mut client))
        .await
        .expect("console should finish at end of input")
        .unwrap();

    assert_eq!(*prompts.lock().unwrap(), vec!["> ", "> ", "> "]);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_console_exits_when_kernel_dies_mid_execution() {
    let root = TempDir::new().unwrap();
    let mut kernel = start_kernel(root.path(), json!(["sleep", "3"]));

    let (tx, _rx) = mpsc::unbounded_channel();
    let fake = FakeKernel::bind(kernel.connection_info(), tx).await;
    tokio::spawn(fake.serve());

    let (mut client, _) = kernel.connect_ready(Duration::from_secs(2)).await.unwrap();

    let (reader, prompts) = scripted(&["hang()", "1 + 1"]);
    let mut console = Console::with_reader(PromptStyle::r_like(), reader);

    tokio::time::timeout(Duration::from_secs(15), console.interact(&mut kernel, &mut client))
        .await
        .expect("console should notice the kernel exiting")
        .unwrap();

    assert!(!kernel.is_alive());
    assert_eq!(*prompts.lock().unwrap(), vec!["> "]);
}
