//! Transport layer for remote tool servers.
//!
//! - [`Transport`] moves one outgoing JSON-RPC message to the server and
//!   hands back whatever frames came back with it.
//! - [`HttpTransport`] implements it over streamable HTTP: a POST per
//!   message, answered with either a JSON body or an SSE stream whose
//!   `data:` events carry frames.
//! - [`classify_message`] tells responses, server requests and
//!   notifications apart so the client can route each frame.

use super::error::{ProtocolError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Frames received in reply to one outgoing message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportReply {
    pub frames: Vec<Value>,
    /// Session id assigned by the server, if it sent one
    pub session_id: Option<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `message`, tagged with `session_id` when one is established.
    async fn send(&self, message: &Value, session_id: Option<&str>) -> Result<TransportReply>;

    /// Release the server-side session. Best effort.
    async fn terminate(&self, _session_id: &str) {}
}

/// Classification of an incoming JSON-RPC frame.
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A response to a request we sent (has `id`, no `method`).
    Response { id: u64 },
    /// A request from the server (has `id` + `method`).
    IncomingRequest,
    /// A notification (has `method`, no `id`).
    Notification,
    /// Anything else, including responses with non-numeric ids.
    Unknown,
}

/// Classify a JSON-RPC frame by inspecting `id` and `method` fields.
pub fn classify_message(json: &Value) -> MessageKind {
    let id = json.get("id").filter(|v| !v.is_null());
    let has_method = json.get("method").and_then(|v| v.as_str()).is_some();

    match (id, has_method) {
        (Some(_), true) => MessageKind::IncomingRequest,
        (Some(id), false) => match id.as_u64() {
            Some(id) => MessageKind::Response { id },
            None => MessageKind::Unknown,
        },
        (None, true) => MessageKind::Notification,
        (None, false) => MessageKind::Unknown,
    }
}

/// Extract JSON-RPC frames from an SSE body.
///
/// Consecutive `data:` lines form one event; events end at a blank line.
/// Events that are not valid JSON are skipped.
pub fn parse_sse_frames(body: &str) -> Vec<Value> {
    let mut frames = Vec::new();
    let mut data = String::new();

    for line in body.lines() {
        if line.is_empty() {
            flush_event(&mut data, &mut frames);
        } else if let Some(payload) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(payload.strip_prefix(' ').unwrap_or(payload));
        }
        // `event:`, `id:`, `retry:` and comments carry nothing we route on.
    }
    flush_event(&mut data, &mut frames);

    frames
}

fn flush_event(data: &mut String, frames: &mut Vec<Value>) {
    if data.is_empty() {
        return;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(value) => push_frames(value, frames),
        Err(e) => debug!("Skipping non-JSON SSE event: {}", e),
    }
    data.clear();
}

/// A JSON-RPC batch arrives as an array; everything else is one frame.
fn push_frames(value: Value, frames: &mut Vec<Value>) {
    match value {
        Value::Array(items) => frames.extend(items),
        other => frames.push(other),
    }
}

/// Streamable HTTP transport.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProtocolError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let mut header_map = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ProtocolError::Transport(format!("Invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProtocolError::Transport(format!("Invalid value for header '{}': {}", key, e)))?;
            header_map.insert(name, value);
        }

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers: header_map,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, message: &Value, session_id: Option<&str>) -> Result<TransportReply> {
        trace!(endpoint = %self.endpoint, "Sending: {}", message);

        let mut request = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(id) = session_id {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        let assigned_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if status == reqwest::StatusCode::NOT_FOUND && session_id.is_some() {
            return Err(ProtocolError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProtocolError::Transport(format!("HTTP {}: {}", status, body.trim())));
        }

        let body = response.text().await?;
        trace!(endpoint = %self.endpoint, "Received: {}", body);

        let frames = if body.trim().is_empty() {
            Vec::new()
        } else if is_sse {
            parse_sse_frames(&body)
        } else {
            let mut frames = Vec::new();
            let value = serde_json::from_str(&body)
                .map_err(|e| ProtocolError::InvalidResponse(format!("Invalid JSON body: {}", e)))?;
            push_frames(value, &mut frames);
            frames
        };

        Ok(TransportReply {
            frames,
            session_id: assigned_session,
        })
    }

    async fn terminate(&self, session_id: &str) {
        let result = self
            .client
            .delete(&self.endpoint)
            .headers(self.headers.clone())
            .header(SESSION_HEADER, session_id)
            .send()
            .await;
        if let Err(e) = result {
            warn!(endpoint = %self.endpoint, error = %e, "Failed to terminate session");
        }
    }
}
