use crate::tools::context_doc::ContextDocBuilder;
use rmcp::model::{CallToolResult, Content};
use scout_engine::EngineError;
use scout_protocol::{ErrorCode, ErrorEnvelope};
use scout_search::SearchError;
use serde_json::json;

pub(in crate::tools::dispatch) fn tool_error_envelope(error: ErrorEnvelope) -> CallToolResult {
    let mut doc = ContextDocBuilder::new();
    doc.push_answer(&format!("error: {}", error.code.as_str()));
    doc.push_note(&error.message);
    if let Some(hint) = error.hint.as_deref() {
        if !hint.trim().is_empty() {
            doc.push_note(&format!("hint: {hint}"));
        }
    }

    let mut result = CallToolResult::error(vec![Content::text(doc.finish())]);
    result.structured_content = Some(json!({ "error": error }));
    result
}

pub(in crate::tools::dispatch) fn invalid_request(message: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope::new(ErrorCode::InvalidRequest, message)
}

pub(in crate::tools::dispatch) fn internal_error(message: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope::new(ErrorCode::Internal, message)
}

pub(in crate::tools::dispatch) fn engine_error(err: &EngineError) -> ErrorEnvelope {
    let envelope = ErrorEnvelope::new(ErrorCode::Engine, err.to_string());
    match err {
        EngineError::Spawn { .. } => {
            envelope.with_hint("Check SCOUT_ENGINE_BIN points at an executable engine binary.")
        }
        EngineError::Timeout { .. } => envelope.with_hint("The engine is busy; retry shortly."),
        EngineError::UnparsableOutput(_) => envelope.with_hint(
            "The engine printed no JSON; the index may need a rebuild (`index` tool).",
        ),
        _ => envelope,
    }
}

pub(in crate::tools::dispatch) fn search_error(err: &SearchError) -> ErrorEnvelope {
    match err {
        SearchError::EmptyQuery => invalid_request("Query must not be empty"),
        SearchError::Engine(err) => engine_error(err),
    }
}
