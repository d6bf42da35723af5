//! Startup registration of backend servers from a catalog file.
//!
//! File format:
//! ```json
//! { "servers": [
//!     { "name": "fs", "url": "http://127.0.0.1:9001/mcp",
//!       "headers": { "authorization": "Bearer ..." },
//!       "tools": [ { "name": "read_file", "description": "...", "inputSchema": {} } ] },
//!     { "name": "github", "url": "http://127.0.0.1:9002/mcp", "enabled": false }
//! ] }
//! ```
//! Servers without inline `tools` are asked for their catalog.

use crate::dispatch::{BackendAdapter, HttpBackend};
use crate::error::{AppError, Result};
use crate::ingestion::sync::CatalogSync;
use crate::ingestion::types::{BootstrapCatalog, ServerDefinition};
use std::path::Path;
use std::sync::Arc;

pub fn load_bootstrap(path: &Path) -> Result<BootstrapCatalog> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::CatalogError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        AppError::CatalogError(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Register every enabled server of `catalog`. A server that fails is logged
/// and skipped. Returns how many servers were registered.
pub async fn apply_bootstrap(sync: &CatalogSync, catalog: BootstrapCatalog) -> usize {
    let mut registered = 0;

    for server in catalog.servers {
        if !server.enabled {
            tracing::info!(server = %server.name, "Server disabled, skipping");
            continue;
        }

        let name = server.name.clone();
        match register_definition(sync, server).await {
            Ok(tools) => {
                tracing::info!(server = %name, tools, "Server registered");
                registered += 1;
            }
            Err(e) => tracing::warn!(server = %name, error = %e, "Failed to register server"),
        }
    }

    registered
}

async fn register_definition(sync: &CatalogSync, server: ServerDefinition) -> Result<usize> {
    let backend = HttpBackend::new(&server.name, &server.url, &server.headers)
        .map_err(|e| AppError::CatalogError(e.to_string()))?;
    let adapter: Arc<dyn BackendAdapter> = Arc::new(backend);

    let tools = match server.tools {
        Some(tools) => tools,
        None => adapter
            .list_tools()
            .await
            .map_err(|e| AppError::CatalogError(format!("Failed to list tools: {}", e)))?,
    };

    sync.register_server(&server.name, adapter, tools).await
}
