//! Text embedding for semantic tool search.
//!
//! The routing core only depends on the [`Embedder`] trait. A model-backed
//! embedder can be plugged in by implementing it; [`HashingEmbedder`] is the
//! dependency-free default used by the binary.

pub mod hashing;

pub use hashing::HashingEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Turns text into a fixed-width vector. Implementations must be safe to call
/// concurrently from many requests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Width of every vector returned by [`Embedder::embed`].
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. The default runs them one after another.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
