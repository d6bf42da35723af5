//! Shared fixtures for the API integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use toolroute::dispatch::{
    BackendAdapter, BackendError, InvocationContext, ToolCall, ToolOutput,
};
use toolroute::ingestion::{ToolDescriptor, ToolSpec};
use toolroute::{AppState, Config, Embedder, Result};
use tower::ServiceExt;

/// Embeds every text onto the x axis, so a tool indexed at
/// `[s, sqrt(1 - s^2)]` scores similarity `s` for any query.
pub struct AxisEmbedder;

#[async_trait]
impl Embedder for AxisEmbedder {
    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

pub enum Behavior {
    Echo,
    Fail(&'static str),
    Sleep(Duration),
    Panic,
}

/// Backend adapter that records every call it receives.
pub struct RecordingBackend {
    behavior: Behavior,
    calls: AtomicUsize,
    sessions: Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendAdapter for RecordingBackend {
    fn transport(&self) -> &'static str {
        "recording"
    }

    async fn list_tools(&self) -> std::result::Result<Vec<ToolSpec>, BackendError> {
        Ok(Vec::new())
    }

    async fn invoke(
        &self,
        call: ToolCall,
        ctx: &InvocationContext,
    ) -> std::result::Result<ToolOutput, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().unwrap().push(ctx.session_id.clone());

        match &self.behavior {
            Behavior::Echo => Ok(ToolOutput {
                content: Some(vec![json!({
                    "type": "text",
                    "text": format!("{} {}", call.tool_name, call.arguments.into_value())
                })]),
                is_error: None,
            }),
            Behavior::Fail(message) => Err(BackendError::Execution(message.to_string())),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(ToolOutput::default())
            }
            Behavior::Panic => panic!("adapter exploded"),
        }
    }
}

pub fn test_state(smart_routing: bool) -> Arc<AppState> {
    let config = Config {
        smart_routing_enabled: smart_routing,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config, Arc::new(AxisEmbedder)));
    state.mark_ready();
    state
}

/// Index `tools` for `server` at the given similarities and register
/// `backend` as its adapter.
pub fn add_server(
    state: &AppState,
    server: &str,
    backend: Arc<RecordingBackend>,
    tools: &[(&str, f32)],
) {
    let specs: Vec<ToolSpec> = tools
        .iter()
        .map(|(name, _)| ToolSpec::new(*name, format!("{} tool", name), json!({ "type": "object" })))
        .collect();

    let descriptors = specs
        .iter()
        .zip(tools)
        .map(|(spec, (_, sim))| ToolDescriptor::new(server, spec, vec![*sim, (1.0 - sim * sim).sqrt()]))
        .collect();

    state
        .index
        .upsert_server(server, [0; 32], descriptors)
        .unwrap();
    state.backends.register(server, backend, specs);
}

/// Send a request to the router and decode the JSON body.
pub async fn json_request(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

pub async fn json_post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    json_request(app, uri, &[], &body.to_string()).await
}

pub fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-4)
}
