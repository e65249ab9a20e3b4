#![allow(dead_code)]

use async_trait::async_trait;
use scout_engine::{Engine, EngineError, Result};
use scout_protocol::FeedbackSignal;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-process engine answering searches by query substring.
#[derive(Default)]
pub struct StubEngine {
    routes: Vec<(String, Value)>,
    failing: Vec<String>,
    latency: Option<Duration>,
    searches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// First route whose needle occurs in the query wins.
    pub fn route(mut self, needle: &str, payload: Value) -> Self {
        self.routes.push((needle.to_string(), payload));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    /// Every search takes this long, so overlapping calls become observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Most searches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for StubEngine {
    async fn search(&self, query: &str, _limit: usize) -> Result<Value> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(latency) = self.latency {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.failing.iter().any(|needle| query.contains(needle.as_str())) {
            return Err(EngineError::Engine(format!("stub failure for '{query}'")));
        }
        Ok(self
            .routes
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, payload)| payload.clone())
            .unwrap_or_else(|| json!([])))
    }

    async fn index(&self, _root: &Path) -> Result<Value> {
        Ok(json!({ "indexed": 0 }))
    }

    async fn stats(&self) -> Result<Value> {
        Ok(json!({ "records": 0 }))
    }

    async fn feedback(&self, _signals: &[FeedbackSignal]) -> Result<()> {
        Ok(())
    }

    async fn restart(&self) -> bool {
        true
    }

    async fn shutdown(&self) {}

    fn persistent_ready(&self) -> bool {
        false
    }
}
