//! Tool dispatch: resolving a tool name to its backend and invoking it.
//!
//! Backends are reached through the [`BackendAdapter`] trait regardless of
//! transport; [`DispatchRouter`] turns every outcome, including routing and
//! backend failures, into one [`InvocationResult`] shape.

pub mod arguments;
pub mod http;
pub mod registry;
pub mod router;
pub mod types;

pub use arguments::ToolArguments;
pub use http::HttpBackend;
pub use registry::{BackendEntry, BackendRegistry};
pub use router::DispatchRouter;
pub use types::{
    BackendError, DispatchFailure, InvocationContext, InvocationRequest, InvocationResult,
    ToolCall, ToolOutput, DEFAULT_SESSION_ID,
};

use crate::ingestion::ToolSpec;
use async_trait::async_trait;

/// Connection to one backend tool server.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Transport label for logs ("http", "stdio", ...).
    fn transport(&self) -> &'static str;

    /// Fetch the server's current tool catalog.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, BackendError>;

    async fn invoke(
        &self,
        call: ToolCall,
        ctx: &InvocationContext,
    ) -> Result<ToolOutput, BackendError>;
}
