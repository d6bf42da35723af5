//! Deterministic feature-hashing embedder.
//!
//! Each lowercase word token and each character trigram of a word is hashed
//! into one of `dim` signed buckets. The bucket counts are L2-normalized so
//! cosine similarity between two embeddings reduces to a dot product, the
//! same convention the similarity index relies on.

use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Weight of a whole-word feature relative to a trigram feature.
const WORD_WEIGHT: f32 = 2.0;
const TRIGRAM_WEIGHT: f32 = 1.0;

pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(AppError::EmbeddingError(
                "Embedding dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self { dim })
    }

    /// Compute the embedding synchronously. Never fails for a valid instance.
    pub fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];

        for word in tokenize(text) {
            self.accumulate(&mut vector, word.as_bytes(), WORD_WEIGHT);

            let padded: Vec<char> = format!("^{}$", word).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut vector, trigram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in vector.iter_mut() {
                *val /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.encode(text))
    }
}

/// Split on anything that is not alphanumeric; `snake_case` and `kebab-case`
/// tool names become separate words.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}
