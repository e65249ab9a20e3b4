use super::error::{engine_error, internal_error, invalid_request};
use crate::guard::{self, ReindexError};
use crate::tools::context_doc::ContextDocBuilder;
use crate::tools::dispatch::{ScoutService, ToolOutcome, ToolOutput};
use crate::tools::schemas::index::{IndexRequest, StatsRequest, StatsResult};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Re-index the source tree. Relative paths resolve against the server's source root.
pub(in crate::tools::dispatch) async fn index(
    service: &ScoutService,
    request: IndexRequest,
) -> ToolOutcome {
    let state = service.state();
    let root = resolve_root(&state.source_root, request.path.as_deref());
    if !tokio::fs::metadata(&root)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
    {
        return Err(invalid_request(format!(
            "Index root is not a directory: {}",
            root.display()
        )));
    }

    log::info!("Re-indexing {}", root.display());
    let summary = state.guard.reindex(&root).await.map_err(|err| match err {
        ReindexError::Busy => guard::rebuilding_envelope(),
        ReindexError::Engine(err) => engine_error(&err),
    })?;

    let mut doc = ContextDocBuilder::new();
    doc.push_answer(&format!("indexed {}", root.display()));
    doc.push_note("result cache cleared");
    Ok(ToolOutput {
        doc,
        structured: json!({ "root": root.display().to_string(), "summary": summary }),
        result_paths: Vec::new(),
    })
}

fn resolve_root(source_root: &Path, requested: Option<&str>) -> PathBuf {
    match requested.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) if Path::new(path).is_absolute() => PathBuf::from(path),
        Some(path) => source_root.join(path),
        None => source_root.to_path_buf(),
    }
}

/// Engine statistics plus local server state. An unreachable engine is reported, not raised.
pub(in crate::tools::dispatch) async fn stats(
    service: &ScoutService,
    _request: StatsRequest,
) -> ToolOutcome {
    let state = service.state();
    let (engine, stats_error) = match state.engine.stats().await {
        Ok(stats) => (Some(stats), None),
        Err(err) => {
            log::warn!("Engine stats failed: {err}");
            (None, Some(err.to_string()))
        }
    };
    let result = StatsResult {
        engine,
        engine_error: stats_error,
        index_state: state.guard.state().as_str().to_string(),
        last_rebuild_error: state.guard.last_error(),
        cache_entries: state.pipeline.cache_len(),
        persistent_engine: state.engine.persistent_ready(),
    };

    let mut doc = ContextDocBuilder::new();
    doc.push_answer(&format!(
        "index {}, {} cached result set(s), {} engine",
        result.index_state,
        result.cache_entries,
        if result.persistent_engine {
            "persistent"
        } else {
            "one-shot"
        }
    ));
    if let Some(err) = result.engine_error.as_deref() {
        doc.push_note(&format!("engine stats unavailable: {err}"));
    }
    if let Some(err) = result.last_rebuild_error.as_deref() {
        doc.push_note(&format!("last rebuild error: {err}"));
    }
    if let Some(stats) = result.engine.as_ref() {
        doc.push_blank();
        doc.push_line(&stats.to_string());
    }

    let structured = serde_json::to_value(&result)
        .map_err(|err| internal_error(format!("failed to serialize stats ({err})")))?;
    Ok(ToolOutput {
        doc,
        structured,
        result_paths: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn index_root_resolution() {
        let root = Path::new("/srv/shop");
        assert_eq!(resolve_root(root, None), PathBuf::from("/srv/shop"));
        assert_eq!(resolve_root(root, Some("  ")), PathBuf::from("/srv/shop"));
        assert_eq!(
            resolve_root(root, Some("app/code")),
            PathBuf::from("/srv/shop/app/code")
        );
        assert_eq!(resolve_root(root, Some("/tmp/x")), PathBuf::from("/tmp/x"));
    }
}
