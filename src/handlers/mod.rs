pub mod health;
pub mod invoke;
pub mod search;

pub use health::{health_handler, ready_handler};
pub use invoke::{invoke_handler, invoke_on_server_handler};
pub use search::search_handler;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Success envelope shared by the search and invocation endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// All API routes, without the metrics endpoint and middleware.
pub fn api_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/tools/search", post(search_handler))
        .route("/tools/call", post(invoke_handler))
        .route("/tools/call/:server", post(invoke_on_server_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
