//! Toolroute - smart tool routing across MCP backend servers
//!
//! Semantic discovery of tools exposed by many backend servers, and dispatch
//! of tool calls to the owning backend behind one result shape. This library
//! exposes the components so integration tests and other hosts can embed them.

pub mod config;
pub mod dispatch;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod index;
pub mod ingestion;
pub mod routing;
pub mod server;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use dispatch::{BackendAdapter, DispatchRouter, InvocationRequest, InvocationResult};
pub use embedding::{Embedder, HashingEmbedder};
pub use error::{AppError, Result};
pub use handlers::{api_router, health_handler, invoke_handler, ready_handler, search_handler};
pub use index::{SearchCandidate, SimilarityIndex};
pub use ingestion::{CatalogSync, ToolSpec};
pub use routing::derive_threshold;
pub use state::AppState;
