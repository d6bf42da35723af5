//! MCP backend reached over streamable HTTP (JSON-RPC 2.0 over POST).
//!
//! The `initialize` handshake runs lazily on first use. A request rejected
//! with HTTP 404 under a session id means the server dropped the session; the
//! handshake is rerun and the request retried once. Replies may be plain JSON
//! or a `text/event-stream` carrying the JSON-RPC response as an SSE `data:`
//! event.

use crate::dispatch::types::{BackendError, InvocationContext, ToolCall, ToolOutput};
use crate::dispatch::BackendAdapter;
use crate::ingestion::{parse_tool_catalog, ToolSpec};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";

/// Catalog pages fetched before giving up on a server that keeps paginating.
const MAX_CATALOG_PAGES: usize = 100;

pub struct HttpBackend {
    name: String,
    url: String,
    client: reqwest::Client,
    headers: HeaderMap,
    next_id: AtomicU64,
    session: Mutex<SessionState>,
}

enum SessionState {
    Uninitialized,
    /// Handshake done; holds the backend-issued session id, if any.
    Established(Option<String>),
}

/// Failure of a single JSON-RPC exchange.
enum RpcFailure {
    /// HTTP 404 for a request sent under a session id.
    SessionExpired,
    Backend(BackendError),
}

impl From<BackendError> for RpcFailure {
    fn from(err: BackendError) -> Self {
        RpcFailure::Backend(err)
    }
}

impl RpcFailure {
    fn into_backend(self) -> BackendError {
        match self {
            RpcFailure::SessionExpired => {
                BackendError::Transport("MCP session rejected by server".to_string())
            }
            RpcFailure::Backend(err) => err,
        }
    }
}

impl HttpBackend {
    /// `headers` values must be strings; they are sent with every request.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        headers: &Map<String, Value>,
    ) -> Result<Self, BackendError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in headers {
            let value = value.as_str().ok_or_else(|| {
                BackendError::Transport(format!("Header '{}' must be a string", key))
            })?;
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| BackendError::Transport(format!("Invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| BackendError::Transport(format!("Invalid header '{}': {}", key, e)))?;
            header_map.insert(name, value);
        }

        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: reqwest::Client::new(),
            headers: header_map,
            next_id: AtomicU64::new(1),
            session: Mutex::new(SessionState::Uninitialized),
        })
    }

    /// Current session id, running the handshake first if needed. Concurrent
    /// callers wait on the same handshake.
    async fn session(&self) -> Result<Option<String>, BackendError> {
        let mut state = self.session.lock().await;
        if let SessionState::Established(session) = &*state {
            return Ok(session.clone());
        }

        let session = self.initialize().await?;
        *state = SessionState::Established(session.clone());
        Ok(session)
    }

    /// Forget `stale` unless another caller already replaced it.
    async fn reset_session(&self, stale: Option<&str>) {
        let mut state = self.session.lock().await;
        if matches!(&*state, SessionState::Established(current) if current.as_deref() == stale) {
            *state = SessionState::Uninitialized;
        }
    }

    async fn initialize(&self) -> Result<Option<String>, BackendError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }
        });
        let (session, _) = self
            .rpc("initialize", params, None)
            .await
            .map_err(RpcFailure::into_backend)?;

        self.notify("notifications/initialized", session.as_deref())
            .await
            .map_err(RpcFailure::into_backend)?;

        tracing::info!(
            server = %self.name,
            url = %self.url,
            session = session.is_some(),
            "MCP backend initialized"
        );
        Ok(session)
    }

    /// Send a request within the backend session and return its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let session = self.session().await?;
        match self.rpc(method, params.clone(), session.as_deref()).await {
            Ok((_, result)) => Ok(result),
            Err(RpcFailure::SessionExpired) => {
                tracing::warn!(server = %self.name, method, "MCP session expired, reinitializing");
                self.reset_session(session.as_deref()).await;

                let session = self.session().await?;
                self.rpc(method, params, session.as_deref())
                    .await
                    .map(|(_, result)| result)
                    .map_err(RpcFailure::into_backend)
            }
            Err(RpcFailure::Backend(err)) => Err(err),
        }
    }

    async fn rpc(
        &self,
        method: &str,
        params: Value,
        session: Option<&str>,
    ) -> Result<(Option<String>, Value), RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self.post(&body, session).await?;

        let session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to read response: {}", e)))?;

        let message = if is_stream {
            parse_sse_response(&text, id).ok_or_else(|| {
                BackendError::Transport(format!("No response for request {} in event stream", id))
            })?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| BackendError::Transport(format!("Invalid JSON-RPC response: {}", e)))?
        };

        Ok((session, into_result(message)?))
    }

    async fn notify(&self, method: &str, session: Option<&str>) -> Result<(), RpcFailure> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        self.post(&body, session).await.map(|_| ())
    }

    async fn post(
        &self,
        body: &Value,
        session: Option<&str>,
    ) -> Result<reqwest::Response, RpcFailure> {
        let mut request = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("Request to '{}' failed: {}", self.name, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND && session.is_some() {
            return Err(RpcFailure::SessionExpired);
        }
        if !status.is_success() {
            return Err(BackendError::Transport(format!(
                "Server '{}' responded with HTTP {}",
                self.name, status
            ))
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl BackendAdapter for HttpBackend {
    fn transport(&self) -> &'static str {
        "http"
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, BackendError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_CATALOG_PAGES {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;

            tools.extend(
                parse_tool_catalog(&result, &self.name)
                    .map_err(|e| BackendError::Transport(e.to_string()))?,
            );

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                return Ok(tools);
            }
        }

        Err(BackendError::Transport(format!(
            "Server '{}' returned more than {} catalog pages",
            self.name, MAX_CATALOG_PAGES
        )))
    }

    async fn invoke(
        &self,
        call: ToolCall,
        ctx: &InvocationContext,
    ) -> Result<ToolOutput, BackendError> {
        let params = json!({
            "name": call.tool_name,
            "arguments": call.arguments,
            "_meta": {
                "sessionId": ctx.session_id,
                "callId": ctx.call_id.to_string(),
            }
        });

        let result = self.request("tools/call", params).await?;
        serde_json::from_value(result)
            .map_err(|e| BackendError::Transport(format!("Malformed tools/call result: {}", e)))
    }
}

/// Split a JSON-RPC message into its `result`, mapping `error` objects to
/// [`BackendError::Execution`].
fn into_result(message: Value) -> Result<Value, BackendError> {
    if let Some(error) = message.get("error") {
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        return Err(BackendError::Execution(format!("{} (code {})", text, code)));
    }

    message
        .get("result")
        .cloned()
        .ok_or_else(|| BackendError::Transport("JSON-RPC response has no result".to_string()))
}

/// Find the JSON-RPC response with `id` among the events of an SSE body.
fn parse_sse_response(body: &str, id: u64) -> Option<Value> {
    let mut data = String::new();

    // A trailing empty line flushes the final event
    for line in body.lines().chain(std::iter::once("")) {
        if line.is_empty() {
            if !data.is_empty() {
                if let Ok(message) = serde_json::from_str::<Value>(&data) {
                    if message.get("id").and_then(Value::as_u64) == Some(id) {
                        return Some(message);
                    }
                }
                data.clear();
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

    None
}
