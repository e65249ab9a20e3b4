use crate::client::EngineClient;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::supervisor::EngineSupervisor;
use async_trait::async_trait;
use scout_protocol::FeedbackSignal;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Everything the orchestration layer needs from the embedding engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Raw (un-normalized) search payload.
    async fn search(&self, query: &str, limit: usize) -> Result<Value>;

    async fn index(&self, root: &Path) -> Result<Value>;

    async fn stats(&self) -> Result<Value>;

    /// Best-effort delivery of implicit relevance signals.
    async fn feedback(&self, signals: &[FeedbackSignal]) -> Result<()>;

    /// Replace the persistent channel. `true` when a ready channel is available afterwards.
    async fn restart(&self) -> bool;

    async fn shutdown(&self);

    fn persistent_ready(&self) -> bool;
}

/// Persistent channel first, one-shot invocation as fallback.
pub struct EngineGateway {
    client: EngineClient,
    supervisor: Option<EngineSupervisor>,
}

impl EngineGateway {
    pub fn new(config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            client: EngineClient::new(Arc::clone(&config)),
            supervisor: Some(EngineSupervisor::new(config)),
        }
    }

    /// Never starts a persistent process.
    pub fn oneshot_only(config: EngineConfig) -> Self {
        Self {
            client: EngineClient::new(Arc::new(config)),
            supervisor: None,
        }
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    pub fn supervisor(&self) -> Option<&EngineSupervisor> {
        self.supervisor.as_ref()
    }

    pub async fn start(&self) -> bool {
        match self.supervisor.as_ref() {
            Some(supervisor) => supervisor.start().await,
            None => false,
        }
    }

    fn ready_supervisor(&self) -> Option<&EngineSupervisor> {
        self.supervisor.as_ref().filter(|s| s.is_ready())
    }
}

#[async_trait]
impl Engine for EngineGateway {
    async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        if let Some(supervisor) = self.ready_supervisor() {
            let params = json!({ "query": query, "limit": limit });
            match supervisor.call_default("search", params).await {
                Ok(data) => return Ok(data),
                Err(err) if err.is_transport() => {
                    log::debug!("persistent search failed ({err}); falling back to one-shot");
                }
                Err(err) => return Err(err),
            }
        }
        self.client.search(query, limit).await
    }

    async fn index(&self, root: &Path) -> Result<Value> {
        // The serve process holds the index open; release it before rewriting.
        if let Some(supervisor) = self.supervisor.as_ref() {
            supervisor.stop().await;
        }
        self.client.index(root).await
    }

    async fn stats(&self) -> Result<Value> {
        self.client.stats().await
    }

    async fn feedback(&self, signals: &[FeedbackSignal]) -> Result<()> {
        let supervisor = self.ready_supervisor().ok_or(EngineError::NotRunning)?;
        let params = json!({ "signals": serde_json::to_value(signals)? });
        supervisor.call_default("feedback", params).await.map(|_| ())
    }

    async fn restart(&self) -> bool {
        match self.supervisor.as_ref() {
            Some(supervisor) => {
                supervisor.stop().await;
                supervisor.start().await
            }
            None => false,
        }
    }

    async fn shutdown(&self) {
        if let Some(supervisor) = self.supervisor.as_ref() {
            supervisor.stop().await;
        }
    }

    fn persistent_ready(&self) -> bool {
        self.ready_supervisor().is_some()
    }
}
