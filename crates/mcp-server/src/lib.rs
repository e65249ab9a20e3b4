//! Scout MCP server.
//!
//! Exposes intent-aware semantic search over a PHP e-commerce codebase to AI agents via MCP.
//! The embedding engine runs as an external process (see `scout_engine`); this crate owns the
//! tool surface, implicit feedback and index consistency checks.
//!
//! ## Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "scout": {
//!       "command": "scout-mcp",
//!       "env": { "SCOUT_ROOT": "/srv/shop", "SCOUT_ENGINE_BIN": "scout-engine" }
//!     }
//!   }
//! }
//! ```

pub mod feedback;
pub mod guard;
pub mod logging;
pub mod runtime_env;
mod tools;

pub use tools::ScoutService;

use anyhow::{Context, Result};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use runtime_env::ScoutEnv;
use scout_engine::{Engine, EngineGateway};
use std::sync::Arc;

/// Read the environment, start the engine and serve MCP over stdio until the client leaves.
pub async fn main_entry() -> Result<()> {
    let env = ScoutEnv::from_env().context("invalid Scout environment")?;
    logging::init(Some(&env.log_file));

    log::info!(
        "Starting Scout MCP server (root={}, index={}, persistent={})",
        env.source_root.display(),
        env.db_path.display(),
        env.persistent
    );

    let gateway = if env.persistent {
        EngineGateway::new(env.engine_config())
    } else {
        EngineGateway::oneshot_only(env.engine_config())
    };
    if env.persistent && !gateway.start().await {
        log::warn!("Persistent engine did not become ready; serving with one-shot calls");
    }
    let engine: Arc<dyn Engine> = Arc::new(gateway);

    let service = ScoutService::new(Arc::clone(&engine), &env.db_path, &env.source_root);
    let guard = service.guard();
    tokio::spawn(async move {
        guard.check().await;
    });

    let server = service
        .serve(stdio())
        .await
        .context("failed to start MCP transport")?;
    let reason = server.waiting().await;

    engine.shutdown().await;
    log::info!("Scout MCP server stopped ({reason:?})");
    reason.map(|_| ()).context("MCP server task failed")
}
