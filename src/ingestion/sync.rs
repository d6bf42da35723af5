//! Server registration lifecycle.
//!
//! Registering a server indexes its catalog and makes its adapter routable;
//! removing it tears both down. These are the only writers of the similarity
//! index and the backend registry.

use crate::dispatch::{BackendAdapter, BackendRegistry};
use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use crate::index::SimilarityIndex;
use crate::ingestion::atomizer::{build_search_text, catalog_fingerprint};
use crate::ingestion::types::{ToolDescriptor, ToolSpec};
use std::sync::Arc;

#[derive(Clone)]
pub struct CatalogSync {
    embedder: Arc<dyn Embedder>,
    index: Arc<SimilarityIndex>,
    backends: Arc<BackendRegistry>,
}

impl CatalogSync {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<SimilarityIndex>,
        backends: Arc<BackendRegistry>,
    ) -> Self {
        Self {
            embedder,
            index,
            backends,
        }
    }

    /// Index `tools` for `name` and register `adapter` as its backend.
    ///
    /// A catalog identical to the one already indexed is not re-embedded.
    /// Returns the number of tools registered.
    pub async fn register_server(
        &self,
        name: &str,
        adapter: Arc<dyn BackendAdapter>,
        tools: Vec<ToolSpec>,
    ) -> Result<usize> {
        if name.is_empty() || name.contains('/') {
            return Err(AppError::CatalogError(format!(
                "Invalid server name '{}': must be non-empty and contain no '/'",
                name
            )));
        }

        let fingerprint = catalog_fingerprint(&tools);

        if self.index.fingerprint(name) == Some(fingerprint) {
            tracing::debug!(server = name, "Catalog unchanged, skipping re-embedding");
        } else {
            let start = std::time::Instant::now();
            let texts: Vec<String> = tools.iter().map(|t| build_search_text(name, t)).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != tools.len() {
                return Err(AppError::EmbeddingError(format!(
                    "Embedder returned {} vectors for {} tools of '{}'",
                    vectors.len(),
                    tools.len(),
                    name
                )));
            }

            let descriptors: Vec<ToolDescriptor> = tools
                .iter()
                .zip(vectors)
                .map(|(spec, vector)| ToolDescriptor::new(name, spec, vector))
                .collect();

            self.index.upsert_server(name, fingerprint, descriptors)?;

            tracing::info!(
                server = name,
                tools = tools.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Server catalog indexed"
            );
        }

        let count = tools.len();
        self.backends.register(name, adapter, tools);
        Ok(count)
    }

    /// Re-fetch the catalog of a registered server from its adapter.
    pub async fn refresh_server(&self, name: &str) -> Result<usize> {
        let entry = self
            .backends
            .get(name)
            .ok_or_else(|| AppError::CatalogError(format!("Server '{}' is not registered", name)))?;

        let tools = entry.adapter.list_tools().await.map_err(|e| {
            AppError::CatalogError(format!("Failed to list tools of '{}': {}", name, e))
        })?;

        self.register_server(name, Arc::clone(&entry.adapter), tools)
            .await
    }

    /// Drop the server from both the index and the registry.
    pub fn remove_server(&self, name: &str) -> bool {
        let indexed = self.index.remove_server(name);
        let registered = self.backends.remove(name);
        if indexed || registered {
            tracing::info!(server = name, "Server removed");
        }
        indexed || registered
    }
}
