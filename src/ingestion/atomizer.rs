//! Tool catalog parsing and search-text construction.
//!
//! Turns a backend's `tools/list` output into [`ToolSpec`] records and builds
//! the text each tool is embedded under.

use crate::error::{AppError, Result};
use crate::ingestion::types::ToolSpec;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Maximum description length before truncation
const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum parameter description length for the summary
const MAX_PARAM_DESC_LENGTH: usize = 50;

/// Parse a tool catalog into [`ToolSpec`] records.
///
/// Accepts a full JSON-RPC `tools/list` response (`result.tools`), a bare
/// `{"tools": [...]}` result, or a bare array of tool definitions.
///
/// # Errors
/// Returns `AppError::CatalogError` if no tools array can be found, or if the
/// array is non-empty and every entry is malformed. Individual malformed
/// tools are logged and skipped.
pub fn parse_tool_catalog(json: &Value, server_name: &str) -> Result<Vec<ToolSpec>> {
    let tools_array = extract_tools_array(json)?;

    let mut results = Vec::with_capacity(tools_array.len());
    let mut seen = HashSet::new();

    for (idx, tool_value) in tools_array.iter().enumerate() {
        match normalize_tool(tool_value) {
            Ok(tool) if !seen.insert(tool.name.clone()) => {
                tracing::warn!(
                    index = idx,
                    tool = %tool.name,
                    server = server_name,
                    "Skipping duplicate tool name"
                );
            }
            Ok(tool) => results.push(tool),
            Err(e) => {
                tracing::warn!(
                    index = idx,
                    server = server_name,
                    error = %e,
                    "Skipping malformed tool definition"
                );
            }
        }
    }

    if results.is_empty() && !tools_array.is_empty() {
        return Err(AppError::CatalogError(format!(
            "All tool definitions from '{}' failed to parse",
            server_name
        )));
    }

    tracing::debug!(
        total = tools_array.len(),
        parsed = results.len(),
        server = server_name,
        "Tool catalog parsed"
    );

    Ok(results)
}

fn extract_tools_array(json: &Value) -> Result<&Vec<Value>> {
    if let Some(array) = json.as_array() {
        return Ok(array);
    }

    json.get("result")
        .unwrap_or(json)
        .get("tools")
        .and_then(|t| t.as_array())
        .ok_or_else(|| AppError::CatalogError("Expected a 'tools' array in catalog".into()))
}

fn normalize_tool(tool_value: &Value) -> Result<ToolSpec> {
    let name = tool_value
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            AppError::CatalogError(format!(
                "Tool missing required 'name' field: {:?}",
                tool_value.get("name")
            ))
        })?;

    let description = tool_value
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    let input_schema = match tool_value.get("inputSchema") {
        Some(schema) if schema.is_object() => schema.clone(),
        _ => serde_json::json!({ "type": "object" }),
    };

    Ok(ToolSpec::new(name, description, input_schema))
}

/// Text a tool is embedded under.
///
/// Format: "TOOL: <name> | CONTEXT: <server_name> | FUNC: <description> | INPUTS: <param_summary>"
pub fn build_search_text(server_name: &str, spec: &ToolSpec) -> String {
    format!(
        "TOOL: {} | CONTEXT: {} | FUNC: {} | INPUTS: {}",
        spec.name,
        server_name,
        truncate_description(&spec.description),
        build_param_summary(&spec.input_schema)
    )
}

/// SHA-256 over every field that influences indexing. Two catalogs with the
/// same fingerprint embed to the same vectors.
pub fn catalog_fingerprint(tools: &[ToolSpec]) -> [u8; 32] {
    let mut hasher = Sha256::new();

    for tool in tools {
        hasher.update(tool.name.as_bytes());
        hasher.update(b"|");
        hasher.update(tool.description.as_bytes());
        hasher.update(b"|");
        hasher.update(tool.input_schema.to_string().as_bytes());
        hasher.update(b"\n");
    }

    hasher.finalize().into()
}

/// Truncate to MAX_DESCRIPTION_LENGTH characters with an ellipsis, preferring
/// a word boundary near the cut.
fn truncate_description(desc: &str) -> String {
    let Some((cut, _)) = desc.char_indices().nth(MAX_DESCRIPTION_LENGTH) else {
        return desc.to_string();
    };

    let truncated = &desc[..cut];
    match truncated.rfind(' ') {
        Some(pos) if truncated[pos..].chars().count() < 50 => format!("{}...", &truncated[..pos]),
        _ => format!("{}...", truncated),
    }
}

/// Build parameter summary from inputSchema.properties.
///
/// Format: "param1*: type (desc), param2: type"
/// Required parameters are marked with an asterisk (*).
fn build_param_summary(schema: &Value) -> String {
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return "none".to_string();
    };

    if properties.is_empty() {
        return "none".to_string();
    }

    let required: HashSet<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| format_param(name, prop, required.contains(name.as_str())))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_param(name: &str, prop: &Value, is_required: bool) -> String {
    let param_type = prop.get("type").and_then(|t| t.as_str()).unwrap_or("any");

    // First sentence, capped at MAX_PARAM_DESC_LENGTH chars
    let brief_desc: String = prop
        .get("description")
        .and_then(|d| d.as_str())
        .map(|d| {
            d.split('.')
                .next()
                .unwrap_or("")
                .chars()
                .take(MAX_PARAM_DESC_LENGTH)
                .collect()
        })
        .unwrap_or_default();

    let req_marker = if is_required { "*" } else { "" };

    if brief_desc.is_empty() {
        format!("{}{}: {}", name, req_marker, param_type)
    } else {
        format!("{}{}: {} ({})", name, req_marker, param_type, brief_desc)
    }
}
