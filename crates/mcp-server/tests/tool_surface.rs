mod support;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{RoleClient, RunningService, ServiceExt};
use scout_engine::{Engine, EngineError, Result as EngineResult};
use scout_mcp::guard::GuardState;
use scout_mcp::ScoutService;
use scout_protocol::{FeedbackSignal, RefinementKind};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::text_of;

const CONTROLLER: &str = "app/code/Vendor/Checkout/Controller/Cart/Add.php";

struct StubEngine {
    records: u64,
    index_ok: AtomicBool,
    index_calls: AtomicUsize,
    signals: Mutex<Vec<FeedbackSignal>>,
}

impl StubEngine {
    fn new(records: u64, index_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            records,
            index_ok: AtomicBool::new(index_ok),
            index_calls: AtomicUsize::new(0),
            signals: Mutex::new(Vec::new()),
        })
    }

    fn signals(&self) -> Vec<FeedbackSignal> {
        self.signals.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for StubEngine {
    async fn search(&self, query: &str, _limit: usize) -> EngineResult<Value> {
        if query.contains("controller") {
            return Ok(json!({ "results": [
                { "path": "app/code/Vendor/Checkout/Model/Cart.php", "distance": 0.1 },
                { "path": CONTROLLER, "distance": 0.3, "isController": true },
            ]}));
        }
        Ok(json!({ "results": [] }))
    }

    async fn index(&self, _root: &Path) -> EngineResult<Value> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.index_ok.load(Ordering::SeqCst) {
            Ok(json!({ "indexed": 3 }))
        } else {
            Err(EngineError::Engine("embedding model missing".to_string()))
        }
    }

    async fn stats(&self) -> EngineResult<Value> {
        Ok(json!({ "total_records": self.records }))
    }

    async fn feedback(&self, signals: &[FeedbackSignal]) -> EngineResult<()> {
        self.signals.lock().unwrap().extend_from_slice(signals);
        Ok(())
    }

    async fn restart(&self) -> bool {
        false
    }

    async fn shutdown(&self) {}

    fn persistent_ready(&self) -> bool {
        false
    }
}

async fn connect(service: ScoutService) -> Result<RunningService<RoleClient, ()>> {
    let (server_transport, client_transport) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        let server = service.serve(server_transport).await?;
        server.waiting().await?;
        anyhow::Ok(())
    });
    let client = tokio::time::timeout(Duration::from_secs(5), ().serve(client_transport))
        .await
        .context("timeout connecting client")??;
    Ok(client)
}

async fn call(
    client: &RunningService<RoleClient, ()>,
    name: &'static str,
    args: Value,
) -> Result<CallToolResult> {
    tokio::time::timeout(
        Duration::from_secs(5),
        client.call_tool(CallToolRequestParam {
            name: name.into(),
            arguments: args.as_object().cloned(),
        }),
    )
    .await
    .with_context(|| format!("timeout calling {name}"))?
    .with_context(|| format!("call {name}"))
}

fn error_code(result: &CallToolResult) -> Option<Value> {
    result
        .structured_content
        .as_ref()
        .map(|v| v["error"]["code"].clone())
}

#[tokio::test]
async fn incompatible_index_blocks_search_until_reindexed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let db_path = tmp.path().join("index.db");
    std::fs::write(&db_path, vec![0u8; 8 * 1024])?;

    let engine = StubEngine::new(0, false);
    let service = ScoutService::new(engine.clone(), &db_path, tmp.path());
    let guard = service.guard();
    let rebuild = guard.check().await.context("expected a rebuild to start")?;
    rebuild.await?;
    assert_eq!(guard.state(), GuardState::Incompatible);
    assert!(!db_path.exists(), "incompatible index should be removed");

    let client = connect(service).await?;

    let blocked = call(&client, "search", json!({ "query": "cart add controller" })).await?;
    assert_eq!(blocked.is_error, Some(true));
    assert_eq!(error_code(&blocked), Some(json!("blocked")));
    assert!(text_of(&blocked).contains("embedding model missing"));

    let stats = call(&client, "stats", json!({})).await?;
    assert_ne!(stats.is_error, Some(true));
    let stats = stats.structured_content.context("stats payload")?;
    assert_eq!(stats["index_state"], "incompatible");

    engine.index_ok.store(true, Ordering::SeqCst);
    let index = call(&client, "index", json!({})).await?;
    assert_ne!(index.is_error, Some(true), "index failed: {}", text_of(&index));
    assert_eq!(engine.index_calls.load(Ordering::SeqCst), 2);
    assert_eq!(guard.state(), GuardState::Compatible);

    let search = call(&client, "search", json!({ "query": "cart add controller" })).await?;
    assert_ne!(search.is_error, Some(true));
    let hits = search.structured_content.context("search payload")?;
    assert_eq!(hits["hits"][0]["path"], CONTROLLER);

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn follow_up_find_reaches_the_engine_as_feedback() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let engine = StubEngine::new(10, true);
    let service = ScoutService::new(engine.clone(), tmp.path().join("index.db"), tmp.path());
    let client = connect(service).await?;

    call(&client, "search", json!({ "query": "product price" })).await?;
    call(
        &client,
        "find_plugin",
        json!({ "targetClass": "Magento\\Catalog\\Model\\Product", "targetMethod": "getPrice" }),
    )
    .await?;

    let mut signals = Vec::new();
    for _ in 0..50 {
        signals = engine.signals();
        if !signals.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].kind, RefinementKind::RefinedToPlugin);
    assert_eq!(signals[0].query, "product price");
    assert_eq!(signals[0].follow_up_tool.as_deref(), Some("find_plugin"));

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn trace_flow_and_find_controller_share_the_route_mapping() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let engine = StubEngine::new(10, true);
    let service = ScoutService::new(engine, tmp.path().join("index.db"), tmp.path());
    let client = connect(service).await?;

    let trace = call(&client, "trace_flow", json!({ "entryPoint": "checkout/cart/add" })).await?;
    assert_ne!(trace.is_error, Some(true));
    let payload = trace.structured_content.context("trace payload")?;
    assert_eq!(payload["entry_type"], "route");
    assert_eq!(payload["handler"][0]["path"], CONTROLLER);
    assert_eq!(
        payload["summary"],
        "Route checkout/cart/add → Vendor\\Checkout\\Controller\\Cart\\Add::execute → 0 plugins, 0 observers"
    );

    let found = call(&client, "find_controller", json!({ "route": "checkout/cart/add" })).await?;
    let payload = found.structured_content.context("find_controller payload")?;
    assert_eq!(payload["intent"], "controller");
    assert_eq!(payload["hits"][0]["path"], CONTROLLER);

    let invalid = call(&client, "module_structure", json!({ "moduleName": "Checkout" })).await?;
    assert_eq!(invalid.is_error, Some(true));
    assert_eq!(error_code(&invalid), Some(json!("invalid_request")));

    client.cancel().await?;
    Ok(())
}
