//! In-memory similarity index over registered tools.
//!
//! Holds one [`ToolDescriptor`] per tool, grouped by owning server. Writers
//! (catalog sync) swap a whole server slot at a time; readers take a snapshot
//! of the slot list under a short read lock and score it without holding the
//! lock, so queries never wait on each other.

use crate::error::{AppError, Result};
use crate::ingestion::ToolDescriptor;
use crate::routing::ranking::compare_candidates;
use ndarray::{Array1, ArrayView1};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A tool that matched a query, with its similarity in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCandidate {
    pub server_name: String,
    pub tool_name: String,
    pub description: String,
    pub input_schema: Value,
    pub similarity: f64,
}

struct ServerSlot {
    fingerprint: [u8; 32],
    tools: Vec<ToolDescriptor>,
}

pub struct SimilarityIndex {
    dim: usize,
    servers: RwLock<HashMap<String, Arc<ServerSlot>>>,
}

impl SimilarityIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            servers: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dim
    }

    /// Replace everything indexed for `server` with `tools`.
    ///
    /// Vectors are L2-normalized on the way in. Fails without touching the
    /// index if any vector has the wrong width.
    pub fn upsert_server(
        &self,
        server: &str,
        fingerprint: [u8; 32],
        mut tools: Vec<ToolDescriptor>,
    ) -> Result<()> {
        for tool in tools.iter_mut() {
            if tool.vector.len() != self.dim {
                return Err(AppError::IndexError(format!(
                    "Tool '{}' on '{}' has dimension {}, index expects {}",
                    tool.tool_name,
                    server,
                    tool.vector.len(),
                    self.dim
                )));
            }
            normalize(&mut tool.vector);
        }

        let count = tools.len();
        self.servers
            .write()
            .insert(server.to_string(), Arc::new(ServerSlot { fingerprint, tools }));

        tracing::debug!(server, tools = count, "Server tools indexed");
        Ok(())
    }

    /// Drop every descriptor owned by `server`. Returns whether it was indexed.
    pub fn remove_server(&self, server: &str) -> bool {
        self.servers.write().remove(server).is_some()
    }

    pub fn fingerprint(&self, server: &str) -> Option<[u8; 32]> {
        self.servers.read().get(server).map(|slot| slot.fingerprint)
    }

    /// Total number of indexed tools.
    pub fn len(&self) -> usize {
        self.servers.read().values().map(|s| s.tools.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn server_count(&self) -> usize {
        self.servers.read().len()
    }

    /// Score every indexed tool against `vector` and return those with
    /// similarity >= `threshold`, best first, at most `limit` of them.
    ///
    /// Similarity is the cosine of the two vectors with negative values
    /// clamped to zero.
    pub fn query(&self, vector: &[f32], limit: usize, threshold: f64) -> Result<Vec<SearchCandidate>> {
        if vector.len() != self.dim {
            return Err(AppError::IndexError(format!(
                "Query vector has dimension {}, index expects {}",
                vector.len(),
                self.dim
            )));
        }

        let mut query = Array1::from_vec(vector.to_vec());
        normalize(&mut query);

        let slots: Vec<Arc<ServerSlot>> = self.servers.read().values().cloned().collect();

        let mut candidates: Vec<SearchCandidate> = slots
            .iter()
            .flat_map(|slot| slot.tools.iter())
            .filter_map(|tool| {
                let similarity = cosine(query.view(), tool.vector.view());
                (similarity >= threshold).then(|| SearchCandidate {
                    server_name: tool.server_name.clone(),
                    tool_name: tool.tool_name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.input_schema.clone(),
                    similarity,
                })
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates.truncate(limit);
        Ok(candidates)
    }
}

fn normalize(vector: &mut Array1<f32>) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.mapv_inplace(|v| v / norm);
    }
}

/// Both inputs are already normalized, so the dot product is the cosine.
fn cosine(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
    (a.dot(&b) as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::ToolSpec;
    use serde_json::json;

    fn descriptor(server: &str, tool: &str, vector: Vec<f32>) -> ToolDescriptor {
        ToolDescriptor::new(server, &ToolSpec::new(tool, "", json!({})), vector)
    }

    /// Unit vector at `angle` radians from the x axis.
    fn at_angle(angle: f32) -> Vec<f32> {
        vec![angle.cos(), angle.sin()]
    }

    fn sample_index() -> SimilarityIndex {
        let index = SimilarityIndex::new(2);
        index
            .upsert_server(
                "alpha",
                [1; 32],
                vec![descriptor("alpha", "near", at_angle(0.1)), descriptor("alpha", "far", at_angle(1.4))],
            )
            .unwrap();
        index
            .upsert_server("beta", [2; 32], vec![descriptor("beta", "mid", at_angle(0.6))])
            .unwrap();
        index
    }

    #[test]
    fn test_query_orders_by_similarity_and_applies_threshold() {
        let index = sample_index();
        let results = index.query(&[1.0, 0.0], 10, 0.5).unwrap();

        let names: Vec<&str> = results.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["near", "mid"]);
        assert!((results[0].similarity - 0.1f64.cos()).abs() < 1e-5);
    }

    #[test]
    fn test_query_respects_limit() {
        let index = sample_index();
        let results = index.query(&[1.0, 0.0], 1, 0.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_name, "near");
    }

    #[test]
    fn test_opposite_vectors_clamp_to_zero() {
        let index = SimilarityIndex::new(2);
        index
            .upsert_server("s", [0; 32], vec![descriptor("s", "opposite", vec![-1.0, 0.0])])
            .unwrap();

        let results = index.query(&[1.0, 0.0], 10, 0.0).unwrap();
        assert_eq!(results[0].similarity, 0.0);
    }

    #[test]
    fn test_unnormalized_vectors_are_normalized() {
        let index = SimilarityIndex::new(2);
        index
            .upsert_server("s", [0; 32], vec![descriptor("s", "big", vec![10.0, 0.0])])
            .unwrap();

        let results = index.query(&[3.0, 0.0], 10, 0.99).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = SimilarityIndex::new(3);
        let err = index
            .upsert_server("s", [0; 32], vec![descriptor("s", "t", vec![1.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, AppError::IndexError(_)));
        assert!(index.fingerprint("s").is_none());

        assert!(index.query(&[1.0, 0.0], 10, 0.0).is_err());
    }

    #[test]
    fn test_upsert_replaces_and_remove_tears_down() {
        let index = sample_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index.server_count(), 2);

        index
            .upsert_server("alpha", [9; 32], vec![descriptor("alpha", "only", at_angle(0.0))])
            .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.fingerprint("alpha"), Some([9; 32]));

        assert!(index.remove_server("beta"));
        assert!(!index.remove_server("beta"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.fingerprint("beta"), None);
    }
}
