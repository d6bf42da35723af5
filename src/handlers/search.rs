//! Semantic search handler for tool discovery.
//!
//! Ranks the tools of every connected server against a natural-language
//! query and groups the matches by server:
//!
//! 1. **Validation**: `query` must be a non-empty string
//! 2. **Feature gate**: smart routing must be enabled
//! 3. **Normalization**: `limit` clamped to [1, 100], `threshold` clamped or
//!    derived from the query
//! 4. **Retrieval**: embed the query, score the index
//! 5. **Ranking**: sort, group by server, attach guidance metadata

use crate::error::{AppError, Result};
use crate::handlers::ApiResponse;
use crate::routing::{effective_limit, effective_threshold, search_tools, SearchOutcome};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Fields are kept as raw JSON so malformed values can be normalized
/// instead of rejected.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub threshold: Option<Value>,
}

/// POST /tools/search - Find tools relevant to a natural language query.
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchOutcome>>> {
    let start_time = std::time::Instant::now();

    let Json(request) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let query = match &request.query {
        Some(Value::String(q)) if !q.trim().is_empty() => q.clone(),
        _ => {
            return Err(AppError::ValidationError(
                "Query parameter is required and must be a non-empty string".to_string(),
            ))
        }
    };

    if !state.smart_routing_enabled() {
        return Err(AppError::FeatureDisabled);
    }

    let limit = effective_limit(request.limit.as_ref());
    let threshold = effective_threshold(&query, request.threshold.as_ref());

    let outcome = search_tools(
        state.embedder.as_ref(),
        &state.index,
        &query,
        limit,
        threshold,
    )
    .await?;

    let total_time = start_time.elapsed();
    tracing::info!(
        query = %query,
        limit,
        threshold,
        results = outcome.metadata.total_results,
        servers = outcome.metadata.server_count,
        total_ms = total_time.as_millis(),
        "Search completed"
    );

    metrics::counter!("search_requests_total").increment(1);
    metrics::histogram!("search_latency_ms").record(total_time.as_millis() as f64);
    metrics::histogram!("search_results").record(outcome.metadata.total_results as f64);

    Ok(Json(ApiResponse::ok(outcome)))
}
