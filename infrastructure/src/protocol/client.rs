//! Protocol client: one session with one remote tool server.
//!
//! ```text
//!  Disconnected ──connect──▶ Handshaking ──ok──▶ Ready
//!       ▲                        │                 │
//!       │                        │ error           │ transport failure
//!       │                        ▼                 ▼
//!       └──────────────── (first connect: Failed)  reconnect once
//!                                                  │
//!                         too many consecutive failures ──▶ Failed
//! ```
//!
//! Requests carry a per-client id. Every frame that comes back is routed
//! through the pending table by that id alone, so concurrent invocations
//! never see each other's responses, and frames nobody is waiting for are
//! dropped.
//!
//! Once `Failed`, every further call fails fast without touching the
//! transport.

use super::error::{ProtocolError, Result};
use super::messages::{
    CallToolParams, CallToolResult, InitializeParams, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult,
};
use super::transport::{MessageKind, Transport, TransportReply, classify_message};
use conductor_domain::ToolDescriptor;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Lifecycle of a [`ProtocolClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Handshaking,
    Ready,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct SessionState {
    connection: ConnectionState,
    session_id: Option<String>,
    consecutive_failures: u32,
}

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>;

/// Removes a pending entry when its request finishes or is abandoned.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(&self.id);
    }
}

pub struct ProtocolClient {
    name: String,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
    pending: PendingMap,
    next_id: AtomicU64,
    /// Serializes handshakes so concurrent reconnects collapse into one
    handshake_lock: tokio::sync::Mutex<()>,
    max_consecutive_failures: u32,
}

impl ProtocolClient {
    pub fn new(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
            state: Mutex::new(SessionState {
                connection: ConnectionState::Disconnected,
                session_id: None,
                consecutive_failures: 0,
            }),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            handshake_lock: tokio::sync::Mutex::new(()),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        self.lock_state().connection
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock_state().session_id.clone()
    }

    /// Requests sent and still waiting for their response
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Perform the initial handshake.
    ///
    /// A failure here is final: the client moves to `Failed` and the caller
    /// is expected not to register any of its tools.
    pub async fn connect(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Ready => return Ok(()),
            ConnectionState::Failed => return Err(ProtocolError::ServerFailed(self.name.clone())),
            _ => {}
        }

        self.handshake().await.inspect_err(|_| {
            self.set_connection(ConnectionState::Failed);
        })
    }

    /// Discover the server's tools. Only valid once connected.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_ready()?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", Some(params)).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| ProtocolError::InvalidResponse(format!("tools/list: {}", e)))?;

            tools.extend(page.tools.into_iter().map(|t| t.into_descriptor()));

            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_ref() != Some(&next) => {
                    cursor = Some(next)
                }
                _ => break,
            }
        }

        debug!(server = %self.name, count = tools.len(), "Discovered tools");
        Ok(tools)
    }

    /// Call a tool on the server.
    ///
    /// A transport failure triggers one reconnect and one retry. A reply that
    /// cannot be decoded or correlated fails without a retry but still counts
    /// towards the failure limit. Errors the server reports itself (JSON-RPC
    /// errors) are returned as-is and do not count.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<CallToolResult> {
        if self.state() == ConnectionState::Failed {
            return Err(ProtocolError::ServerFailed(self.name.clone()));
        }

        let params = serde_json::to_value(CallToolParams { name, arguments })?;
        let outcome = match self.call_tool(params.clone()).await {
            Err(e) if e.is_transport() => {
                warn!(server = %self.name, tool = name, error = %e, "Tool call failed, reconnecting");
                self.reset_session();
                match self.handshake().await {
                    Ok(()) => self.call_tool(params).await,
                    Err(e) => Err(e),
                }
            }
            other => other,
        };

        self.record(outcome)
    }

    /// Tear the session down. The client can connect again afterwards
    /// unless it has failed.
    pub async fn close(&self) {
        let session_id = {
            let mut state = self.lock_state();
            if state.connection != ConnectionState::Failed {
                state.connection = ConnectionState::Disconnected;
            }
            state.session_id.take()
        };
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        if let Some(id) = session_id {
            self.transport.terminate(&id).await;
        }
        info!(server = %self.name, "Closed tool server session");
    }

    async fn call_tool(&self, params: Value) -> Result<CallToolResult> {
        if self.state() != ConnectionState::Ready {
            self.handshake().await?;
        }
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| ProtocolError::InvalidResponse(format!("tools/call: {}", e)))
    }

    async fn handshake(&self) -> Result<()> {
        let _guard = self.handshake_lock.lock().await;

        match self.state() {
            ConnectionState::Ready => return Ok(()),
            ConnectionState::Failed => return Err(ProtocolError::ServerFailed(self.name.clone())),
            _ => {}
        }

        {
            let mut state = self.lock_state();
            state.connection = ConnectionState::Handshaking;
            state.session_id = None;
        }
        debug!(server = %self.name, "Starting handshake");

        let result = async {
            let params = serde_json::to_value(InitializeParams::default())?;
            let init = self.request("initialize", Some(params)).await?;
            self.notify("notifications/initialized").await?;
            Ok::<_, ProtocolError>(init)
        }
        .await;

        match result {
            Ok(init) => {
                self.set_connection(ConnectionState::Ready);
                info!(
                    server = %self.name,
                    remote = init.pointer("/serverInfo/name").and_then(|v| v.as_str()).unwrap_or("unknown"),
                    protocol = init.get("protocolVersion").and_then(|v| v.as_str()).unwrap_or("unknown"),
                    "Tool server ready"
                );
                Ok(())
            }
            Err(e) => {
                self.set_connection(ConnectionState::Disconnected);
                warn!(server = %self.name, error = %e, "Handshake failed");
                Err(ProtocolError::Handshake {
                    server: self.name.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Send a request and wait for the frame carrying its id.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = serde_json::to_value(JsonRpcRequest::new(id, method, params))?;

        let (tx, mut rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        debug!(server = %self.name, request_id = id, method, "Sending request");
        let session_id = self.session_id();
        let reply = self.transport.send(&message, session_id.as_deref()).await?;
        self.absorb(reply);

        let response = rx.try_recv().map_err(|_| {
            ProtocolError::InvalidResponse(format!("No response for request id {}", id))
        })?;

        if let Some(error) = response.error {
            return Err(ProtocolError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let message = serde_json::to_value(JsonRpcNotification::new(method))?;
        let session_id = self.session_id();
        let reply = self.transport.send(&message, session_id.as_deref()).await?;
        self.absorb(reply);
        Ok(())
    }

    fn absorb(&self, reply: TransportReply) {
        if let Some(id) = reply.session_id {
            self.lock_state().session_id = Some(id);
        }
        for frame in reply.frames {
            self.route(frame);
        }
    }

    /// Deliver a frame to the request waiting for it, or drop it.
    fn route(&self, frame: Value) {
        match classify_message(&frame) {
            MessageKind::Response { id } => {
                let sender = self
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id);
                let Some(tx) = sender else {
                    debug!(server = %self.name, request_id = id, "Dropping response with no pending request");
                    return;
                };
                match serde_json::from_value::<JsonRpcResponse>(frame) {
                    Ok(response) => {
                        let _ = tx.send(response);
                    }
                    Err(e) => {
                        warn!(server = %self.name, request_id = id, error = %e, "Dropping malformed response");
                    }
                }
            }
            MessageKind::Notification => {
                trace!(
                    server = %self.name,
                    method = frame.get("method").and_then(|m| m.as_str()).unwrap_or(""),
                    "Notification"
                );
            }
            MessageKind::IncomingRequest => {
                debug!(server = %self.name, "Ignoring request from server");
            }
            MessageKind::Unknown => {
                debug!(server = %self.name, "Dropping unroutable frame: {}", frame);
            }
        }
    }

    fn record(&self, outcome: Result<CallToolResult>) -> Result<CallToolResult> {
        let mut state = self.lock_state();
        match &outcome {
            Ok(_) | Err(ProtocolError::Rpc { .. }) => state.consecutive_failures = 0,
            Err(ProtocolError::ServerFailed(_)) => {}
            Err(_) => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.max_consecutive_failures {
                    state.connection = ConnectionState::Failed;
                    warn!(
                        server = %self.name,
                        failures = state.consecutive_failures,
                        "Tool server marked as failed"
                    );
                    return Err(ProtocolError::ServerFailed(self.name.clone()));
                }
            }
        }
        outcome
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Failed => Err(ProtocolError::ServerFailed(self.name.clone())),
            other => Err(ProtocolError::NotReady {
                server: self.name.clone(),
                state: other.as_str(),
            }),
        }
    }

    fn reset_session(&self) {
        let mut state = self.lock_state();
        if state.connection != ConnectionState::Failed {
            state.connection = ConnectionState::Disconnected;
        }
        state.session_id = None;
    }

    fn set_connection(&self, connection: ConnectionState) {
        self.lock_state().connection = connection;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
