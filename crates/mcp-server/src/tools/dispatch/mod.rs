//! MCP tool dispatch for Scout.
//!
//! Every tool call runs through [`ScoutService::dispatch`]: request log, consistency gate,
//! the tool body, response/error log, then feedback bookkeeping.

mod router;
mod service;

use super::context_doc::ContextDocBuilder;
use crate::feedback::{self, FeedbackTracker};
use crate::guard::ConsistencyGuard;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use scout_engine::Engine;
use scout_protocol::ErrorEnvelope;
use scout_search::{SearchPipeline, TraceEngine};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Log target for per-call request/response/error lines.
pub const REQUEST_LOG: &str = "scout::requests";

#[derive(Clone)]
pub struct ScoutService {
    tool_router: ToolRouter<Self>,
    state: Arc<ServiceState>,
}

pub(crate) struct ServiceState {
    pub engine: Arc<dyn Engine>,
    pub pipeline: Arc<SearchPipeline>,
    pub tracer: TraceEngine,
    pub guard: Arc<ConsistencyGuard>,
    pub feedback: Mutex<FeedbackTracker>,
    pub source_root: PathBuf,
}

/// Successful tool body: rendered text, structured payload and the hit paths the caller saw.
pub(crate) struct ToolOutput {
    pub doc: ContextDocBuilder,
    pub structured: Value,
    pub result_paths: Vec<String>,
}

impl ToolOutput {
    fn into_result(self) -> CallToolResult {
        let mut result = CallToolResult::success(vec![Content::text(self.doc.finish())]);
        result.structured_content = Some(self.structured);
        result
    }
}

pub(crate) type ToolOutcome = Result<ToolOutput, ErrorEnvelope>;

impl ScoutService {
    pub(crate) fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn guard(&self) -> Arc<ConsistencyGuard> {
        Arc::clone(&self.state.guard)
    }

    pub fn engine(&self) -> Arc<dyn Engine> {
        Arc::clone(&self.state.engine)
    }

    async fn dispatch<F>(
        &self,
        tool: &'static str,
        args: Value,
        work: F,
    ) -> Result<CallToolResult, McpError>
    where
        F: Future<Output = ToolOutcome>,
    {
        log::info!(target: REQUEST_LOG, "request tool={tool} args={args}");

        if let Err(envelope) = self.state.guard.gate(tool) {
            log::warn!(
                target: REQUEST_LOG,
                "blocked tool={tool} state={}",
                self.state.guard.state().as_str()
            );
            return Ok(router::error::tool_error_envelope(envelope));
        }

        let started = Instant::now();
        let result = match work.await {
            Ok(output) => {
                log::info!(
                    target: REQUEST_LOG,
                    "response tool={tool} hits={} elapsed_ms={}",
                    output.result_paths.len(),
                    started.elapsed().as_millis()
                );
                self.record_feedback(tool, &args, &output.result_paths);
                output.into_result()
            }
            Err(envelope) => {
                log::error!(
                    target: REQUEST_LOG,
                    "error tool={tool} code={} message={}",
                    envelope.code.as_str(),
                    envelope.message
                );
                router::error::tool_error_envelope(envelope)
            }
        };
        self.flush_feedback();
        Ok(result)
    }

    fn record_feedback(&self, tool: &str, args: &Value, result_paths: &[String]) {
        self.lock_feedback()
            .record_operation(tool, args, result_paths);
    }

    fn flush_feedback(&self) {
        let signals = self.lock_feedback().flush();
        feedback::deliver(Arc::clone(&self.state.engine), signals);
    }

    fn lock_feedback(&self) -> std::sync::MutexGuard<'_, FeedbackTracker> {
        self.state
            .feedback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
