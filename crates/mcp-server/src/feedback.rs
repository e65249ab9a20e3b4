//! Implicit relevance feedback inferred from the sequence of tool calls.

use scout_engine::Engine;
use scout_protocol::{FeedbackSignal, RefinementKind};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const QUERY_REFINEMENT_WINDOW: Duration = Duration::from_secs(60);
pub const FOLLOW_UP_WINDOW: Duration = Duration::from_secs(30);

const GENERIC_SEARCH: &str = "search";

#[derive(Debug, Clone)]
struct LastSearch {
    query: String,
    result_paths: Vec<String>,
    at: Instant,
}

#[derive(Debug, Default)]
pub struct FeedbackTracker {
    last_search: Option<LastSearch>,
    pending: Vec<FeedbackSignal>,
}

impl FeedbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_operation(&mut self, name: &str, args: &Value, result_paths: &[String]) {
        self.record_operation_at(name, args, result_paths, Instant::now());
    }

    pub fn record_operation_at(
        &mut self,
        name: &str,
        args: &Value,
        result_paths: &[String],
        now: Instant,
    ) {
        if name == GENERIC_SEARCH {
            let Some(query) = args.get("query").and_then(Value::as_str).map(str::trim) else {
                return;
            };
            if let Some(last) = self.recent_search(now, QUERY_REFINEMENT_WINDOW) {
                if last.query != query {
                    let signal = FeedbackSignal {
                        kind: RefinementKind::QueryRefinement,
                        query: last.query.clone(),
                        result_paths: last.result_paths.clone(),
                        new_query: Some(query.to_string()),
                        follow_up_tool: None,
                        follow_up_args: None,
                        timestamp_ms: unix_ms(),
                    };
                    self.pending.push(signal);
                }
            }
            self.last_search = Some(LastSearch {
                query: query.to_string(),
                result_paths: result_paths.to_vec(),
                at: now,
            });
            return;
        }

        let Some(kind) = RefinementKind::for_follow_up(name) else {
            return;
        };
        if let Some(last) = self.recent_search(now, FOLLOW_UP_WINDOW) {
            let signal = FeedbackSignal {
                kind,
                query: last.query.clone(),
                result_paths: last.result_paths.clone(),
                new_query: None,
                follow_up_tool: Some(name.to_string()),
                follow_up_args: Some(args.clone()),
                timestamp_ms: unix_ms(),
            };
            self.pending.push(signal);
        }
    }

    /// Drain every signal recorded since the last flush.
    pub fn flush(&mut self) -> Vec<FeedbackSignal> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn recent_search(&self, now: Instant, window: Duration) -> Option<&LastSearch> {
        self.last_search
            .as_ref()
            .filter(|last| now.saturating_duration_since(last.at) <= window)
    }
}

/// Send signals to the engine in the background. Delivery is best effort.
pub fn deliver(engine: Arc<dyn Engine>, signals: Vec<FeedbackSignal>) {
    if signals.is_empty() {
        return;
    }
    tokio::spawn(async move {
        let count = signals.len();
        match engine.feedback(&signals).await {
            Ok(()) => log::debug!("Delivered {count} feedback signal(s)"),
            Err(err) => log::debug!("Dropped {count} feedback signal(s): {err}"),
        }
    });
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
