use super::{router, ScoutService, ServiceState};
use crate::feedback::FeedbackTracker;
use crate::guard::ConsistencyGuard;
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool_handler, ServerHandler};
use scout_engine::Engine;
use scout_search::{SearchPipeline, TraceEngine};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const INSTRUCTIONS: &str = "Scout: intent-aware semantic search over a Magento-style PHP codebase. \
Start with `search`; narrow down with the `find_*` tools (plugins, observers, preferences, \
controllers, config files); use `trace_flow` to follow a route, API path, GraphQL field, event \
or cron job through its handler, config and interceptors. Output: `A:` answer, `R:` path score \
label, `N:` notes; structured_content carries the same data as JSON.";

impl ScoutService {
    pub fn new(
        engine: Arc<dyn Engine>,
        db_path: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
    ) -> Self {
        let source_root = source_root.into();
        let pipeline = Arc::new(SearchPipeline::new(Arc::clone(&engine)));
        let guard = ConsistencyGuard::new(
            Arc::clone(&engine),
            Arc::clone(&pipeline),
            db_path,
            source_root.clone(),
        );
        Self {
            tool_router: router::build_tool_router(),
            state: Arc::new(ServiceState {
                tracer: TraceEngine::new(Arc::clone(&pipeline)),
                engine,
                pipeline,
                guard,
                feedback: Mutex::new(FeedbackTracker::new()),
                source_root,
            }),
        }
    }
}

#[tool_handler]
impl ServerHandler for ScoutService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
