//! Index compatibility check with a one-time background rebuild.
//!
//! `Unchecked -> Compatible`, or `Unchecked -> Incompatible -> Rebuilding -> Compatible`.
//! A failed rebuild leaves `Incompatible` until an operator re-index succeeds. Rebuilds, whether
//! started here or by the `index` tool, hold one lock and never overlap.

use scout_engine::{Engine, EngineError, Result as EngineResult};
use scout_protocol::{ErrorCode, ErrorEnvelope};
use scout_search::SearchPipeline;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// An index at least this large that reports zero records was written in a format the engine
/// cannot read.
pub const MIN_SUSPECT_INDEX_BYTES: u64 = 4 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Unchecked,
    Compatible,
    Incompatible,
    Rebuilding,
}

impl GuardState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Compatible => "compatible",
            Self::Incompatible => "incompatible",
            Self::Rebuilding => "rebuilding",
        }
    }
}

pub struct ConsistencyGuard {
    engine: Arc<dyn Engine>,
    pipeline: Arc<SearchPipeline>,
    db_path: PathBuf,
    source_root: PathBuf,
    state: watch::Sender<GuardState>,
    rebuild_started: AtomicBool,
    rebuild_lock: AsyncMutex<()>,
    last_error: Mutex<Option<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReindexError {
    #[error("another index rebuild is already running")]
    Busy,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ConsistencyGuard {
    pub fn new(
        engine: Arc<dyn Engine>,
        pipeline: Arc<SearchPipeline>,
        db_path: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(GuardState::Unchecked);
        Arc::new(Self {
            engine,
            pipeline,
            db_path: db_path.into(),
            source_root: source_root.into(),
            state,
            rebuild_started: AtomicBool::new(false),
            rebuild_lock: AsyncMutex::new(()),
            last_error: Mutex::new(None),
        })
    }

    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Validate the on-disk index and start a rebuild when it is unreadable.
    ///
    /// Returns the rebuild task when this call started one.
    pub async fn check(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let size = match tokio::fs::metadata(&self.db_path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                log::info!(
                    "No index at {}; nothing to validate",
                    self.db_path.display()
                );
                self.state.send_replace(GuardState::Compatible);
                return None;
            }
        };

        let stats = match self.engine.stats().await {
            Ok(stats) => stats,
            Err(err) => {
                // Stays `Unchecked`: non-blocking, index untouched.
                log::warn!("Index stats failed ({err}); leaving compatibility unchecked");
                return None;
            }
        };

        let records = record_count(&stats);
        if records == Some(0) && size >= MIN_SUSPECT_INDEX_BYTES {
            log::warn!(
                "Index {} is {} bytes but reports no records; rebuilding",
                self.db_path.display(),
                size
            );
            self.state.send_replace(GuardState::Incompatible);
            return self.start_rebuild();
        }

        log::info!("Index compatible (records={records:?}, bytes={size})");
        self.state.send_replace(GuardState::Compatible);
        None
    }

    /// Spawn the background rebuild. Only the first call in the guard's lifetime does anything.
    pub fn start_rebuild(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.rebuild_started.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.state.send_replace(GuardState::Rebuilding);

        let guard = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _rebuild = guard.rebuild_lock.lock().await;
            guard.state.send_replace(GuardState::Rebuilding);
            if let Err(err) = remove_index(&guard.db_path).await {
                log::warn!("Failed to remove index {}: {err}", guard.db_path.display());
            }
            let rebuilt =
                rebuild_index(guard.engine.as_ref(), &guard.pipeline, &guard.source_root).await;
            match rebuilt {
                Ok(_) => {
                    log::info!("Index rebuild finished");
                    guard.set_error(None);
                    guard.state.send_replace(GuardState::Compatible);
                }
                Err(err) => {
                    log::error!("Index rebuild failed: {err}");
                    guard.set_error(Some(err.to_string()));
                    guard.state.send_replace(GuardState::Incompatible);
                }
            }
        }))
    }

    /// Gate a tool call. Tools that never read the index (`stats`, `analyze_diff`) always pass;
    /// `index` is refused only during a rebuild.
    pub fn gate(&self, tool: &str) -> Result<(), ErrorEnvelope> {
        let state = self.state();
        match (tool, state) {
            ("stats" | "analyze_diff", _) => Ok(()),
            (_, GuardState::Rebuilding) => Err(rebuilding_envelope()),
            ("index", _) => Ok(()),
            (_, GuardState::Incompatible) => {
                let reason = self
                    .last_error()
                    .map(|err| format!(" Last rebuild error: {err}"))
                    .unwrap_or_default();
                Err(ErrorEnvelope::new(
                    ErrorCode::Blocked,
                    format!("The search index is incompatible and could not be rebuilt.{reason}"),
                )
                .with_hint("Run the `index` tool to rebuild it."))
            }
            _ => Ok(()),
        }
    }

    /// Operator re-index of `root`. Searches are gated while it runs; a concurrent rebuild
    /// makes this return [`ReindexError::Busy`] instead of waiting.
    pub async fn reindex(&self, root: &Path) -> Result<Value, ReindexError> {
        let Ok(_rebuild) = self.rebuild_lock.try_lock() else {
            return Err(ReindexError::Busy);
        };
        let previous = self.state.send_replace(GuardState::Rebuilding);
        match rebuild_index(self.engine.as_ref(), &self.pipeline, root).await {
            Ok(summary) => {
                self.set_error(None);
                self.state.send_replace(GuardState::Compatible);
                Ok(summary)
            }
            Err(err) => {
                log::warn!("Re-index of {} failed: {err}", root.display());
                self.state.send_replace(previous);
                Err(err.into())
            }
        }
    }

    fn set_error(&self, err: Option<String>) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = err;
    }
}

/// Envelope for calls refused while the index is being rewritten.
pub fn rebuilding_envelope() -> ErrorEnvelope {
    ErrorEnvelope::new(
        ErrorCode::Blocked,
        "The search index is being rebuilt; results would be incomplete.",
    )
    .with_hint("Retry in a few minutes; `stats` shows progress.")
}

/// Full re-index: the engine rewrites the index, cached results are dropped and the persistent
/// channel is reopened on the new index.
async fn rebuild_index(
    engine: &dyn Engine,
    pipeline: &SearchPipeline,
    root: &Path,
) -> EngineResult<Value> {
    let summary = engine.index(root).await?;
    pipeline.clear_cache();
    if !engine.restart().await {
        log::info!("Persistent engine not available after re-index; using one-shot calls");
    }
    Ok(summary)
}

async fn remove_index(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Record count from an engine stats payload, wherever the engine put it.
fn record_count(stats: &Value) -> Option<u64> {
    const KEYS: &[&str] = &[
        "records",
        "total_records",
        "totalRecords",
        "record_count",
        "count",
        "documents",
        "vectors",
    ];
    let lookup = |obj: &Value| KEYS.iter().find_map(|key| obj.get(*key).and_then(Value::as_u64));
    lookup(stats).or_else(|| {
        ["stats", "index"]
            .iter()
            .find_map(|nested| stats.get(*nested).and_then(lookup))
    })
}
