//! Tool invocation handlers.
//!
//! A tool that fails (unknown tool, bad arguments, backend error, timeout)
//! still produces a 200 response; the failure is in `data.isError` and
//! `data.content`. Only malformed requests and internal faults are errors.

use crate::dispatch::{InvocationRequest, ToolArguments, DEFAULT_SESSION_ID};
use crate::error::{AppError, Result};
use crate::handlers::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Optional per-call deadline in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-timeout-ms";

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    #[serde(default, rename = "toolName")]
    pub tool_name: Option<Value>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub content: Vec<Value>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    pub arguments: Value,
}

/// POST /tools/call - Invoke a tool resolved by name.
pub async fn invoke_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InvokeResponse>>> {
    invoke(state, None, headers, payload).await
}

/// POST /tools/call/:server - Invoke a tool on a specific server.
pub async fn invoke_on_server_handler(
    State(state): State<Arc<AppState>>,
    Path(server): Path<String>,
    headers: HeaderMap,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InvokeResponse>>> {
    invoke(state, Some(server), headers, payload).await
}

async fn invoke(
    state: Arc<AppState>,
    server: Option<String>,
    headers: HeaderMap,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InvokeResponse>>> {
    let Json(request) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let tool_name = match request.tool_name {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => {
            return Err(AppError::ValidationError(
                "toolName is required and must be a non-empty string".to_string(),
            ))
        }
    };
    let arguments = ToolArguments::from_json(request.arguments)?;
    let timeout = state.config.effective_timeout(requested_timeout(&headers)?);

    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string();

    let mut invocation =
        InvocationRequest::new(tool_name.clone(), arguments.clone()).with_session(session_id);
    if let Some(server) = server {
        invocation = invocation.with_target_server(server);
    }

    let result = state.router.invoke(invocation, timeout).await?;

    Ok(Json(ApiResponse::ok(InvokeResponse {
        content: result.content,
        is_error: result.is_error,
        tool_name,
        arguments: arguments.into_value(),
    })))
}

fn requested_timeout(headers: &HeaderMap) -> Result<Option<u64>> {
    let Some(raw) = headers.get(TIMEOUT_HEADER) else {
        return Ok(None);
    };

    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} must be a non-negative integer number of milliseconds",
                TIMEOUT_HEADER
            ))
        })
}
