//! Smart routing: semantic search over the tools of every connected server.
//!
//! query -> threshold policy -> embedder -> similarity index -> ranking & grouping

pub mod ranking;
pub mod threshold;

pub use ranking::{build_metadata, rank_and_group, RankedResults, SearchMetadata, ServerGroup};
pub use threshold::{derive_threshold, effective_limit, effective_threshold};

use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use crate::index::{SearchCandidate, SimilarityIndex};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub tools: Vec<SearchCandidate>,
    pub servers: Vec<ServerGroup>,
    pub metadata: SearchMetadata,
}

/// Run one search with an already-normalized `limit` and `threshold`.
pub async fn search_tools(
    embedder: &dyn Embedder,
    index: &SimilarityIndex,
    query: &str,
    limit: usize,
    threshold: f64,
) -> Result<SearchOutcome> {
    let vector = embedder.embed(query).await?;
    if vector.len() != index.dimensions() {
        return Err(AppError::EmbeddingError(format!(
            "Embedder produced {} dimensions, index expects {}",
            vector.len(),
            index.dimensions()
        )));
    }

    let candidates = index.query(&vector, limit, threshold)?;
    let ranked = rank_and_group(candidates);
    let metadata = build_metadata(query, threshold, &ranked);

    Ok(SearchOutcome {
        tools: ranked.tools,
        servers: ranked.servers,
        metadata,
    })
}
