use crate::dispatch::registry::{BackendEntry, BackendRegistry};
use crate::dispatch::types::{
    DispatchFailure, InvocationContext, InvocationRequest, InvocationResult, ToolCall,
};
use crate::error::{AppError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Resolves tool invocations to a backend and normalizes the outcome.
///
/// # Resolution
/// 1. An explicit target server routes straight to that server. A tool name
///    already prefixed with `<server>/` has the prefix stripped.
/// 2. A `server/tool` name whose prefix is a registered server routes to it.
///    Otherwise the whole string is treated as a bare tool name, so tool
///    names containing `/` still resolve.
/// 3. A bare name routes to its single owner. No owner is `ToolNotFound`;
///    several owners is `Ambiguous` (never first-match).
#[derive(Clone)]
pub struct DispatchRouter {
    registry: Arc<BackendRegistry>,
}

impl DispatchRouter {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    /// Run `request` with the given deadline.
    ///
    /// Routing, argument, timeout and backend failures come back as
    /// `Ok(InvocationResult { is_error: true, .. })`. `Err` is reserved for
    /// faults in the dispatch machinery itself, such as a panicking adapter.
    pub async fn invoke(
        &self,
        request: InvocationRequest,
        timeout: Duration,
    ) -> Result<InvocationResult> {
        let start = Instant::now();
        let tool_name = request.tool_name.clone();

        let outcome = self.dispatch(request, timeout).await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        metrics::histogram!("tool_invocation_latency_ms").record(elapsed_ms as f64);

        match outcome {
            Ok(Ok(result)) => {
                let outcome = if result.is_error { "tool_error" } else { "success" };
                metrics::counter!("tool_invocations_total", "outcome" => outcome).increment(1);
                tracing::debug!(tool = %tool_name, elapsed_ms, is_error = result.is_error, "Tool invocation completed");
                Ok(result)
            }
            Ok(Err(failure)) => {
                metrics::counter!("tool_invocations_total", "outcome" => failure.kind()).increment(1);
                tracing::warn!(
                    tool = %tool_name,
                    kind = failure.kind(),
                    elapsed_ms,
                    error = %failure,
                    "Tool invocation failed"
                );
                Ok(InvocationResult::failure(failure.to_string()))
            }
            Err(e) => {
                metrics::counter!("tool_invocations_total", "outcome" => "internal").increment(1);
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        request: InvocationRequest,
        timeout: Duration,
    ) -> Result<std::result::Result<InvocationResult, DispatchFailure>> {
        let (entry, tool) = match self.resolve(&request.tool_name, request.target_server.as_deref()) {
            Ok(resolved) => resolved,
            Err(failure) => return Ok(Err(failure)),
        };

        let Some(spec) = entry.tool(&tool) else {
            return Ok(Err(DispatchFailure::ToolNotFound {
                tool,
                server: Some(entry.name.clone()),
            }));
        };

        if let Err(errors) = request.arguments.validate(&spec.input_schema) {
            return Ok(Err(DispatchFailure::InvalidArguments { tool, errors }));
        }

        let ctx = InvocationContext {
            session_id: request.session_id,
            call_id: Uuid::new_v4(),
            timeout,
        };

        tracing::info!(
            tool = %tool,
            server = %entry.name,
            transport = entry.adapter.transport(),
            session_id = %ctx.session_id,
            call_id = %ctx.call_id,
            "Dispatching tool call"
        );

        let call = ToolCall {
            tool_name: tool.clone(),
            arguments: request.arguments,
        };
        let adapter = Arc::clone(&entry.adapter);

        // Dropping the guard (deadline, or the caller going away) aborts the call
        let mut task = AbortOnDrop(tokio::spawn(async move { adapter.invoke(call, &ctx).await }));

        match tokio::time::timeout(timeout, &mut task.0).await {
            Ok(Ok(Ok(output))) => Ok(Ok(InvocationResult::from(output))),
            Ok(Ok(Err(source))) => Ok(Err(DispatchFailure::Backend {
                tool,
                server: entry.name.clone(),
                source,
            })),
            Ok(Err(join_err)) => Err(AppError::InternalError(format!(
                "Adapter task for '{}' on '{}' did not complete: {}",
                tool, entry.name, join_err
            ))),
            Err(_) => Ok(Err(DispatchFailure::Timeout {
                tool,
                server: entry.name.clone(),
                timeout_ms: timeout.as_millis(),
            })),
        }
    }

    fn resolve(
        &self,
        tool_name: &str,
        target_server: Option<&str>,
    ) -> std::result::Result<(Arc<BackendEntry>, String), DispatchFailure> {
        if let Some(server) = target_server.filter(|s| !s.is_empty()) {
            let entry = self
                .registry
                .get(server)
                .ok_or_else(|| DispatchFailure::ServerNotFound(server.to_string()))?;
            let tool = tool_name
                .strip_prefix(server)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(tool_name);
            return Ok((entry, tool.to_string()));
        }

        if let Some((server, tool)) = tool_name.split_once('/') {
            if let Some(entry) = self.registry.get(server) {
                return Ok((entry, tool.to_string()));
            }
        }

        let owners = self.registry.owners(tool_name);
        match owners.len() {
            0 => Err(DispatchFailure::ToolNotFound {
                tool: tool_name.to_string(),
                server: None,
            }),
            // The owner may have been removed since `owners` was taken
            1 => self
                .registry
                .get(&owners[0])
                .map(|entry| (entry, tool_name.to_string()))
                .ok_or_else(|| DispatchFailure::ServerNotFound(owners[0].clone())),
            _ => Err(DispatchFailure::Ambiguous {
                tool: tool_name.to_string(),
                servers: owners,
            }),
        }
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
