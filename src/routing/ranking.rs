//! Ranking and per-server grouping of search candidates.
//!
//! Ordering is fully deterministic: equal similarities are broken by server
//! name, then tool name (both ascending). Groups with equal best scores are
//! ordered by server name.

use crate::index::SearchCandidate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Candidate order: similarity descending, then server name, then tool name.
pub fn compare_candidates(a: &SearchCandidate, b: &SearchCandidate) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.server_name.cmp(&b.server_name))
        .then_with(|| a.tool_name.cmp(&b.tool_name))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroup {
    pub server_name: String,
    pub tools: Vec<SearchCandidate>,
    pub max_similarity: f64,
    pub avg_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResults {
    pub tools: Vec<SearchCandidate>,
    pub servers: Vec<ServerGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub query: String,
    pub threshold: f64,
    pub total_results: usize,
    pub server_count: usize,
    pub guideline: String,
    pub next_steps: String,
}

/// Sort `candidates` and build the grouped-by-server view.
pub fn rank_and_group(mut candidates: Vec<SearchCandidate>) -> RankedResults {
    candidates.sort_by(compare_candidates);

    // Groups in first-seen order while accumulating
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(String, Vec<SearchCandidate>)> = Vec::new();

    for candidate in &candidates {
        let slot = *positions
            .entry(candidate.server_name.as_str())
            .or_insert_with(|| {
                grouped.push((candidate.server_name.clone(), Vec::new()));
                grouped.len() - 1
            });
        grouped[slot].1.push(candidate.clone());
    }

    let mut servers: Vec<ServerGroup> = grouped
        .into_iter()
        .map(|(server_name, mut tools)| {
            tools.sort_by(compare_candidates);
            let max_similarity = tools
                .iter()
                .map(|t| t.similarity)
                .fold(f64::NEG_INFINITY, f64::max);
            let avg_similarity =
                tools.iter().map(|t| t.similarity).sum::<f64>() / tools.len() as f64;

            ServerGroup {
                server_name,
                tools,
                max_similarity,
                avg_similarity,
            }
        })
        .collect();

    servers.sort_by(|a, b| {
        b.max_similarity
            .total_cmp(&a.max_similarity)
            .then_with(|| a.server_name.cmp(&b.server_name))
    });

    RankedResults {
        tools: candidates,
        servers,
    }
}

/// Response metadata, with guidance that depends on whether anything matched.
pub fn build_metadata(query: &str, threshold: f64, ranked: &RankedResults) -> SearchMetadata {
    let total_results = ranked.tools.len();
    let server_count = ranked.servers.len();

    let (guideline, next_steps) = if total_results > 0 {
        (
            format!(
                "Found {} matching tool(s) across {} server(s), ranked by semantic similarity. \
                 Prefer the highest-scoring tool and check its inputSchema before calling it.",
                total_results, server_count
            ),
            "Invoke a tool via POST /tools/call/{serverName} with its toolName and arguments \
             matching inputSchema. If the matches are too loose, refine the query with more \
             specific terms."
                .to_string(),
        )
    } else {
        (
            format!(
                "No tools matched the query at similarity threshold {:.2}.",
                threshold
            ),
            "Broaden the query with more general terms or pass a lower threshold, then search \
             again."
                .to_string(),
        )
    };

    SearchMetadata {
        query: query.to_string(),
        threshold,
        total_results,
        server_count,
        guideline,
        next_steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(server: &str, tool: &str, similarity: f64) -> SearchCandidate {
        SearchCandidate {
            server_name: server.to_string(),
            tool_name: tool.to_string(),
            description: format!("{} on {}", tool, server),
            input_schema: json!({ "type": "object" }),
            similarity,
        }
    }

    fn names(tools: &[SearchCandidate]) -> Vec<&str> {
        tools.iter().map(|t| t.tool_name.as_str()).collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let ranked = rank_and_group(vec![
            candidate("A", "x", 0.9),
            candidate("B", "y", 0.95),
            candidate("A", "z", 0.8),
        ]);

        assert_eq!(names(&ranked.tools), vec!["y", "x", "z"]);

        assert_eq!(ranked.servers.len(), 2);
        let b = &ranked.servers[0];
        assert_eq!(b.server_name, "B");
        assert_eq!(b.max_similarity, 0.95);
        assert_eq!(b.avg_similarity, 0.95);

        let a = &ranked.servers[1];
        assert_eq!(a.server_name, "A");
        assert_eq!(a.max_similarity, 0.9);
        assert!((a.avg_similarity - 0.85).abs() < 1e-12);
        assert_eq!(names(&a.tools), vec!["x", "z"]);
    }

    #[test]
    fn test_grouping_is_lossless() {
        let ranked = rank_and_group(vec![
            candidate("a", "1", 0.7),
            candidate("b", "2", 0.6),
            candidate("a", "3", 0.9),
            candidate("c", "4", 0.5),
            candidate("b", "5", 0.95),
        ]);

        let grouped: usize = ranked.servers.iter().map(|g| g.tools.len()).sum();
        assert_eq!(grouped, ranked.tools.len());
        assert_eq!(ranked.tools.len(), 5);
    }

    #[test]
    fn test_ties_broken_by_server_then_tool() {
        let ranked = rank_and_group(vec![
            candidate("beta", "b", 0.8),
            candidate("alpha", "z", 0.8),
            candidate("alpha", "a", 0.8),
        ]);

        let order: Vec<(&str, &str)> = ranked
            .tools
            .iter()
            .map(|t| (t.server_name.as_str(), t.tool_name.as_str()))
            .collect();
        assert_eq!(order, vec![("alpha", "a"), ("alpha", "z"), ("beta", "b")]);

        // Equal group maxima fall back to server name
        let groups: Vec<&str> = ranked.servers.iter().map(|g| g.server_name.as_str()).collect();
        assert_eq!(groups, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_ranking_is_deterministic_across_input_orders() {
        let input = vec![
            candidate("s2", "t1", 0.7),
            candidate("s1", "t2", 0.7),
            candidate("s1", "t1", 0.9),
            candidate("s3", "t3", 0.7),
        ];
        let mut reversed = input.clone();
        reversed.reverse();

        let first = rank_and_group(input.clone());
        assert_eq!(first, rank_and_group(input));
        assert_eq!(first, rank_and_group(reversed));
    }

    #[test]
    fn test_empty_input() {
        let ranked = rank_and_group(Vec::new());
        assert!(ranked.tools.is_empty());
        assert!(ranked.servers.is_empty());

        let meta = build_metadata("nothing", 0.65, &ranked);
        assert_eq!(meta.total_results, 0);
        assert_eq!(meta.server_count, 0);
        assert!(meta.next_steps.contains("Broaden"));
    }

    #[test]
    fn test_metadata_for_results() {
        let ranked = rank_and_group(vec![candidate("A", "x", 0.9), candidate("B", "y", 0.8)]);
        let meta = build_metadata("query text", 0.5, &ranked);

        assert_eq!(meta.query, "query text");
        assert_eq!(meta.threshold, 0.5);
        assert_eq!(meta.total_results, 2);
        assert_eq!(meta.server_count, 2);
        assert!(meta.guideline.starts_with("Found 2"));
        assert!(meta.next_steps.contains("refine"));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let ranked = rank_and_group(vec![candidate("A", "x", 0.9)]);
        let value = serde_json::to_value(build_metadata("q", 0.5, &ranked)).unwrap();

        assert_eq!(value["totalResults"], 1);
        assert_eq!(value["serverCount"], 1);
        assert!(value["nextSteps"].is_string());

        let group = serde_json::to_value(&ranked.servers[0]).unwrap();
        assert_eq!(group["serverName"], "A");
        assert_eq!(group["maxSimilarity"], 0.9);
        assert_eq!(group["tools"][0]["toolName"], "x");
    }
}
