use crate::dispatch::BackendAdapter;
use crate::ingestion::ToolSpec;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A connected backend server: its adapter and the catalog it advertised.
pub struct BackendEntry {
    pub name: String,
    pub adapter: Arc<dyn BackendAdapter>,
    tools: HashMap<String, ToolSpec>,
}

impl BackendEntry {
    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Registry of live backend adapters keyed by server name.
///
/// Entries are immutable once inserted; re-registration swaps in a new
/// `Arc`, so readers holding an old entry finish against a consistent view.
#[derive(Default)]
pub struct BackendRegistry {
    servers: RwLock<HashMap<String, Arc<BackendEntry>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`. Returns the previous entry, if any.
    pub fn register(
        &self,
        name: &str,
        adapter: Arc<dyn BackendAdapter>,
        tools: Vec<ToolSpec>,
    ) -> Option<Arc<BackendEntry>> {
        let entry = Arc::new(BackendEntry {
            name: name.to_string(),
            adapter,
            tools: tools.into_iter().map(|t| (t.name.clone(), t)).collect(),
        });
        self.servers.write().insert(name.to_string(), entry)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.servers.write().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<BackendEntry>> {
        self.servers.read().get(name).cloned()
    }

    /// Servers whose catalog contains `tool`, sorted by name.
    pub fn owners(&self, tool: &str) -> Vec<String> {
        let mut owners: Vec<String> = self
            .servers
            .read()
            .values()
            .filter(|entry| entry.has_tool(tool))
            .map(|entry| entry.name.clone())
            .collect();
        owners.sort();
        owners
    }

    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.servers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }
}
