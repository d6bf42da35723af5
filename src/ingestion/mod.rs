//! Ingestion of backend tool catalogs.
//!
//! Parses the catalogs backend servers advertise, embeds them into the
//! similarity index and keeps the index and the backend registry in step as
//! servers come and go.

pub mod atomizer;
pub mod bootstrap;
pub mod sync;
pub mod types;

pub use atomizer::{build_search_text, catalog_fingerprint, parse_tool_catalog};
pub use bootstrap::{apply_bootstrap, load_bootstrap};
pub use sync::CatalogSync;
pub use types::{BootstrapCatalog, ServerDefinition, ToolDescriptor, ToolSpec};
