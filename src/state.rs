use crate::config::Config;
use crate::dispatch::{BackendRegistry, DispatchRouter};
use crate::embedding::Embedder;
use crate::index::SimilarityIndex;
use crate::ingestion::CatalogSync;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// The index and the backend registry are the only shared mutable
/// structures; both are read-mostly and written through [`CatalogSync`].
pub struct AppState {
    pub config: Arc<Config>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<SimilarityIndex>,
    pub backends: Arc<BackendRegistry>,
    pub router: DispatchRouter,
    pub catalog: CatalogSync,
    /// Feature gate for search; toggled by the settings collaborator
    smart_routing: AtomicBool,
    /// Flag indicating the service is ready (bootstrap catalog registered)
    ready: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let index = Arc::new(SimilarityIndex::new(embedder.dimensions()));
        let backends = Arc::new(BackendRegistry::new());

        tracing::info!(
            dimensions = embedder.dimensions(),
            smart_routing = config.smart_routing_enabled,
            "Routing state initialized"
        );

        Self {
            router: DispatchRouter::new(Arc::clone(&backends)),
            catalog: CatalogSync::new(Arc::clone(&embedder), Arc::clone(&index), Arc::clone(&backends)),
            smart_routing: AtomicBool::new(config.smart_routing_enabled),
            ready: AtomicBool::new(false),
            config: Arc::new(config),
            embedder,
            index,
            backends,
        }
    }

    pub fn smart_routing_enabled(&self) -> bool {
        self.smart_routing.load(Ordering::SeqCst)
    }

    pub fn set_smart_routing(&self, enabled: bool) {
        self.smart_routing.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "Smart routing toggled");
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
