//! MCP transport layer.
//!
//! Three ways to reach a server:
//! - [`HttpTransport`]: streamable HTTP (JSON or SSE replies, session header)
//! - [`StdioTransport`]: a child process speaking newline-delimited JSON
//! - [`InProcessTransport`]: a [`McpServer`] living in the same process
//!
//! Any transport-level failure flips the transport to disconnected, so the
//! connection manager's liveness check notices on the next request.

use crate::error::McpError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, SESSION_HEADER};
use crate::server::McpServer;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Transport trait for MCP communication
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its response
    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError>;

    /// Send a notification (no response expected)
    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError>;

    /// Check if the transport is still usable
    fn is_connected(&self) -> bool;

    /// Close the transport
    async fn close(&self) -> Result<(), McpError>;
}

// ── Streamable HTTP ─────────────────────────────────────────────────────

/// Streamable HTTP transport for remote MCP servers
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    session_id: std::sync::Mutex<Option<String>>,
    connected: AtomicBool,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            url: url.into(),
            client,
            session_id: std::sync::Mutex::new(None),
            connected: AtomicBool::new(true),
        }
    }

    fn session(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|s| s.clone())
    }

    fn remember_session(&self, response: &reqwest::Response) {
        let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        if let Ok(mut slot) = self.session_id.lock() {
            if slot.as_deref() != Some(id) {
                debug!(session = %id, "MCP session established");
                *slot = Some(id.to_string());
            }
        }
    }

    fn mark_disconnected(&self, reason: &str) {
        if self.connected.swap(false, Ordering::SeqCst) {
            warn!(url = %self.url, reason, "MCP HTTP transport disconnected");
        }
    }

    async fn post(&self, body: &impl serde::Serialize) -> Result<reqwest::Response, McpError> {
        if !self.is_connected() {
            return Err(McpError::Closed);
        }

        let mut builder = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session) = self.session() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder.send().await.map_err(|e| {
            self.mark_disconnected(&e.to_string());
            McpError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND && self.session().is_some() {
            // The server forgot our session; a fresh connection is needed.
            self.mark_disconnected("session expired");
            return Err(McpError::Transport("MCP session expired".into()));
        }
        if !status.is_success() {
            if status.is_server_error() {
                self.mark_disconnected(status.as_str());
            }
            return Err(McpError::Transport(format!(
                "MCP server returned error status: {status}"
            )));
        }

        self.remember_session(&response);
        Ok(response)
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let id = request.id;
        trace!(method = %request.method, id, "MCP request");
        let response = self.post(&request).await?;

        let is_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let body = response.text().await.map_err(|e| {
            self.mark_disconnected(&e.to_string());
            McpError::Transport(e.to_string())
        })?;

        if is_stream {
            parse_sse_response(&body, id)
        } else {
            serde_json::from_str(&body)
                .map_err(|e| McpError::Protocol(format!("invalid JSON-RPC response: {e}")))
        }
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.post(&JsonRpcNotification::new(method, params)).await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), McpError> {
        self.connected.store(false, Ordering::SeqCst);

        // Best effort: tell the server the session is over.
        if let Some(session) = self.session() {
            let _ = self
                .client
                .delete(&self.url)
                .header(SESSION_HEADER, session)
                .send()
                .await;
        }
        Ok(())
    }
}

/// Find the response to request `id` in a `text/event-stream` body.
///
/// Events are separated by blank lines; multi-line `data:` fields are joined
/// with newlines. Server-initiated messages in the stream are skipped.
pub fn parse_sse_response(body: &str, id: u64) -> Result<JsonRpcResponse, McpError> {
    let mut data = String::new();

    let mut events: Vec<String> = Vec::new();
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                events.push(std::mem::take(&mut data));
            }
            continue;
        }
        if let Some(chunk) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(chunk.strip_prefix(' ').unwrap_or(chunk));
        }
    }
    if !data.is_empty() {
        events.push(data);
    }

    events
        .iter()
        .filter_map(|event| serde_json::from_str::<JsonRpcResponse>(event).ok())
        .find(|response| response.answers(id))
        .ok_or_else(|| McpError::Protocol(format!("no response for request {id} in event stream")))
}

// ── stdio ───────────────────────────────────────────────────────────────

struct StdioPipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Stdio transport for MCP servers running as child processes
pub struct StdioTransport {
    pipes: Mutex<StdioPipes>,
    child: Mutex<Child>,
    connected: AtomicBool,
    timeout: Duration,
}

const DEFAULT_STDIO_TIMEOUT: Duration = Duration::from_secs(30);

impl StdioTransport {
    /// Wrap an already running process
    pub fn new(mut child: Child) -> Result<Self, McpError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Spawn("failed to capture stdin of MCP server".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Spawn("failed to capture stdout of MCP server".into()))?;

        Ok(Self {
            pipes: Mutex::new(StdioPipes {
                stdin,
                stdout: BufReader::new(stdout),
            }),
            child: Mutex::new(child),
            connected: AtomicBool::new(true),
            timeout: DEFAULT_STDIO_TIMEOUT,
        })
    }

    /// How long to wait for a reply before declaring the process hung.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn a new process and create the transport
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| McpError::Spawn(format!("{command}: {e}")))?;

        Self::new(child)
    }

    fn fail(&self, reason: String) -> McpError {
        self.connected.store(false, Ordering::SeqCst);
        McpError::Transport(reason)
    }

    async fn write_line(&self, pipes: &mut StdioPipes, value: &impl serde::Serialize) -> Result<(), McpError> {
        let json = serde_json::to_string(value)
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        let write = async {
            pipes.stdin.write_all(json.as_bytes()).await?;
            pipes.stdin.write_all(b"\n").await?;
            pipes.stdin.flush().await
        };
        write
            .await
            .map_err(|e| self.fail(format!("write to MCP server failed: {e}")))
    }

    /// Read until the reply for `id`; skip notifications and strays.
    async fn read_reply(&self, pipes: &mut StdioPipes, id: u64) -> Result<JsonRpcResponse, McpError> {
        loop {
            let mut line = String::new();
            let read = pipes
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| self.fail(format!("read from MCP server failed: {e}")))?;
            if read == 0 {
                return Err(self.fail("MCP server closed its stdout".into()));
            }

            let value: Value = match serde_json::from_str(line.trim()) {
                Ok(v) => v,
                Err(e) => {
                    trace!(error = %e, "Ignoring non-JSON line from MCP server");
                    continue;
                }
            };
            if value.get("id").is_none() {
                continue;
            }

            let response: JsonRpcResponse = serde_json::from_value(value)
                .map_err(|e| McpError::Protocol(format!("invalid JSON-RPC response: {e}")))?;
            if response.answers(id) {
                return Ok(response);
            }
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        if !self.is_connected() {
            return Err(McpError::Closed);
        }

        let id = request.id;
        let mut pipes = self.pipes.lock().await;
        self.write_line(&mut pipes, &request).await?;

        match tokio::time::timeout(self.timeout, self.read_reply(&mut pipes, id)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "MCP server did not answer");
                Err(self.fail(format!(
                    "no reply from MCP server within {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        if !self.is_connected() {
            return Err(McpError::Closed);
        }
        let mut pipes = self.pipes.lock().await;
        self.write_line(&mut pipes, &JsonRpcNotification::new(method, params))
            .await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), McpError> {
        self.connected.store(false, Ordering::SeqCst);
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        Ok(())
    }
}

// ── in-process ──────────────────────────────────────────────────────────

/// Transport bound directly to an in-process [`McpServer`].
pub struct InProcessTransport {
    server: Arc<McpServer>,
    connected: AtomicBool,
}

impl InProcessTransport {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self {
            server,
            connected: AtomicBool::new(true),
        }
    }

    /// Simulate a dropped connection (used by liveness tests).
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl McpTransport for InProcessTransport {
    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        if !self.is_connected() {
            return Err(McpError::Closed);
        }
        let message = serde_json::to_value(&request).map_err(|e| McpError::Protocol(e.to_string()))?;
        let reply = self
            .server
            .handle_message(message)
            .await
            .ok_or_else(|| McpError::Protocol("server sent no response to a request".into()))?;
        serde_json::from_value(reply).map_err(|e| McpError::Protocol(e.to_string()))
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        if !self.is_connected() {
            return Err(McpError::Closed);
        }
        let message = serde_json::to_value(JsonRpcNotification::new(method, params))
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        self.server.handle_message(message).await;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), McpError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
