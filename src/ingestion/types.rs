//! Type definitions for the ingestion module.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

fn default_input_schema() -> Value {
    json!({ "type": "object" })
}

/// One entry of a backend server's tool catalog, as advertised by the
/// server's `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON schema the tool's arguments must satisfy.
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool registered in the similarity index.
///
/// Created when a server's catalog is ingested and left untouched until that
/// server is re-synced or removed.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub server_name: String,
    pub tool_name: String,
    pub description: String,
    pub input_schema: Value,
    /// L2-normalized embedding of the tool's search text.
    pub vector: Array1<f32>,
}

impl ToolDescriptor {
    pub fn new(server_name: &str, spec: &ToolSpec, vector: Vec<f32>) -> Self {
        Self {
            server_name: server_name.to_string(),
            tool_name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.input_schema.clone(),
            vector: Array1::from_vec(vector),
        }
    }
}

/// One backend server entry of the bootstrap catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerDefinition {
    pub name: String,
    /// Streamable-HTTP endpoint of the server.
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Extra HTTP headers sent with every request (e.g. authorization).
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Inline catalog. When absent the catalog is fetched from the server.
    #[serde(default)]
    pub tools: Option<Vec<ToolSpec>>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapCatalog {
    #[serde(default)]
    pub servers: Vec<ServerDefinition>,
}
