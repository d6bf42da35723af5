use crate::dispatch::arguments::ToolArguments;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Session id used when the caller does not identify one.
pub const DEFAULT_SESSION_ID: &str = "tool-call-session";

/// A caller's request to run one tool.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Bare tool name, or `server/tool` to pin the server.
    pub tool_name: String,
    pub arguments: ToolArguments,
    /// Server to route to, overriding name-based resolution.
    pub target_server: Option<String>,
    pub session_id: String,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            target_server: None,
            session_id: DEFAULT_SESSION_ID.to_string(),
        }
    }

    pub fn with_target_server(mut self, server: impl Into<String>) -> Self {
        self.target_server = Some(server.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// Transport-agnostic envelope handed to a backend adapter.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: ToolArguments,
}

/// Per-call context travelling with the envelope.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub session_id: String,
    /// Unique id of this call, for correlating backend and audit logs.
    pub call_id: Uuid,
    pub timeout: Duration,
}

/// What a backend returned for a tool call, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolOutput {
    #[serde(default)]
    pub content: Option<Vec<Value>>,
    #[serde(default, rename = "isError")]
    pub is_error: Option<bool>,
}

/// Normalized result of an invocation.
///
/// Tool-level failures (including routing failures) are reported here with
/// `is_error` set, never as an error of the invocation itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    pub content: Vec<Value>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl InvocationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": message.into() })],
            is_error: true,
        }
    }
}

impl From<ToolOutput> for InvocationResult {
    fn from(output: ToolOutput) -> Self {
        Self {
            content: output.content.unwrap_or_default(),
            is_error: output.is_error.unwrap_or(false),
        }
    }
}

/// Failure reported by a backend adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend could not be reached or replied with something unusable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend was reached and rejected or failed the call.
    #[error("{0}")]
    Execution(String),
}

/// Why a dispatch did not produce a backend result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchFailure {
    #[error("Server '{0}' not found")]
    ServerNotFound(String),

    #[error("Tool '{tool}' not found{}", .server.as_ref().map(|s| format!(" on server '{}'", s)).unwrap_or_default())]
    ToolNotFound { tool: String, server: Option<String> },

    #[error("Tool '{tool}' is provided by multiple servers ({}); qualify it as 'server/{tool}'", .servers.join(", "))]
    Ambiguous { tool: String, servers: Vec<String> },

    #[error("Invalid arguments for tool '{tool}': {}", .errors.join("; "))]
    InvalidArguments { tool: String, errors: Vec<String> },

    #[error("Tool '{tool}' on server '{server}' timed out after {timeout_ms}ms")]
    Timeout {
        tool: String,
        server: String,
        timeout_ms: u128,
    },

    #[error("Tool '{tool}' on server '{server}' failed: {source}")]
    Backend {
        tool: String,
        server: String,
        source: BackendError,
    },
}

impl DispatchFailure {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchFailure::ServerNotFound(_) | DispatchFailure::ToolNotFound { .. } => "not_found",
            DispatchFailure::Ambiguous { .. } => "ambiguous",
            DispatchFailure::InvalidArguments { .. } => "invalid_arguments",
            DispatchFailure::Timeout { .. } => "timeout",
            DispatchFailure::Backend {
                source: BackendError::Transport(_),
                ..
            } => "transport",
            DispatchFailure::Backend {
                source: BackendError::Execution(_),
                ..
            } => "execution",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_defaults_when_fields_missing() {
        let output: ToolOutput = serde_json::from_value(json!({})).unwrap();
        let result = InvocationResult::from(output);

        assert!(result.content.is_empty());
        assert!(!result.is_error);
    }

    #[test]
    fn test_output_content_passes_through() {
        let output: ToolOutput = serde_json::from_value(json!({
            "content": [{ "type": "image", "data": "AAAA", "mimeType": "image/png" }],
            "isError": true
        }))
        .unwrap();
        let result = InvocationResult::from(output);

        assert!(result.is_error);
        assert_eq!(result.content[0]["mimeType"], "image/png");
    }

    #[test]
    fn test_failure_shape() {
        let value = serde_json::to_value(InvocationResult::failure("boom")).unwrap();
        assert_eq!(
            value,
            json!({ "content": [{ "type": "text", "text": "boom" }], "isError": true })
        );
    }

    #[test]
    fn test_failure_messages_and_kinds() {
        let missing = DispatchFailure::ToolNotFound {
            tool: "t".into(),
            server: Some("s".into()),
        };
        assert_eq!(missing.to_string(), "Tool 't' not found on server 's'");
        assert_eq!(missing.kind(), "not_found");

        let bare = DispatchFailure::ToolNotFound {
            tool: "t".into(),
            server: None,
        };
        assert_eq!(bare.to_string(), "Tool 't' not found");

        let ambiguous = DispatchFailure::Ambiguous {
            tool: "t".into(),
            servers: vec!["a".into(), "b".into()],
        };
        assert!(ambiguous.to_string().contains("(a, b)"));

        let transport = DispatchFailure::Backend {
            tool: "t".into(),
            server: "s".into(),
            source: BackendError::Transport("connection refused".into()),
        };
        assert_eq!(transport.kind(), "transport");
        assert!(transport.to_string().ends_with("transport failure: connection refused"));
    }
}
