use super::error::{internal_error, invalid_request, search_error};
use crate::tools::context_doc::ContextDocBuilder;
use crate::tools::dispatch::{ScoutService, ToolOutcome, ToolOutput};
use crate::tools::schemas::search::{HitsResult, SearchRequest};
use scout_search::{infer_intent, BoostPlan, RankedHit};

pub(in crate::tools::dispatch) const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;
const SNIPPET_LINES: usize = 2;

pub(in crate::tools::dispatch) fn effective_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Trimmed, non-empty value of a required argument.
pub(in crate::tools::dispatch) fn required<'a>(
    value: &'a str,
    name: &str,
) -> Result<&'a str, scout_protocol::ErrorEnvelope> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid_request(format!("`{name}` must not be empty")));
    }
    Ok(value)
}

/// Generic semantic search with the intent inferred from the query text.
pub(in crate::tools::dispatch) async fn search(
    service: &ScoutService,
    request: SearchRequest,
) -> ToolOutcome {
    let query = required(&request.query, "query")?;
    let intent = infer_intent(query);
    run_hits(
        service,
        query.to_string(),
        effective_limit(request.limit),
        intent.label(),
        intent.boost_plan(),
    )
    .await
}

pub(in crate::tools::dispatch) async fn run_hits(
    service: &ScoutService,
    query: String,
    limit: usize,
    intent: &str,
    plan: BoostPlan,
) -> ToolOutcome {
    let ranked = service
        .state()
        .pipeline
        .search(&query, limit, &plan)
        .await
        .map_err(|err| search_error(&err))?;
    render_hits(query, intent, ranked)
}

fn render_hits(query: String, intent: &str, hits: Vec<RankedHit>) -> ToolOutcome {
    let mut doc = ContextDocBuilder::new();
    doc.push_answer(&format!(
        "{} hit(s) for '{}' (intent: {intent})",
        hits.len(),
        query
    ));
    for ranked in &hits {
        doc.push_ref(&ranked.hit.path, ranked.score, hit_label(ranked).as_deref());
        if let Some(snippet) = ranked.hit.snippet.as_deref() {
            doc.push_snippet(snippet, SNIPPET_LINES);
        }
    }
    if hits.is_empty() {
        doc.push_note(
            "no hits; try a broader query, or run `index` if the project was never indexed",
        );
    }

    let result_paths = hits.iter().map(|r| r.hit.path.clone()).collect();
    let payload = HitsResult {
        query,
        intent: intent.to_string(),
        hits,
    };
    let structured = serde_json::to_value(&payload)
        .map_err(|err| internal_error(format!("failed to serialize hits ({err})")))?;
    Ok(ToolOutput {
        doc,
        structured,
        result_paths,
    })
}

/// `[plugin,controller] Vendor\Module\Class::method`
fn hit_label(ranked: &RankedHit) -> Option<String> {
    let hit = &ranked.hit;
    let kinds: Vec<&str> = hit.kinds().map(|kind| kind.label()).collect();
    let symbol = match (hit.class_name.as_deref(), hit.method_name.as_deref()) {
        (Some(class), Some(method)) => Some(format!("{class}::{method}")),
        (Some(class), None) => Some(class.to_string()),
        (None, Some(method)) => Some(format!("::{method}")),
        (None, None) => None,
    };
    let mut parts = Vec::new();
    if !kinds.is_empty() {
        parts.push(format!("[{}]", kinds.join(",")));
    }
    parts.extend(symbol);
    (!parts.is_empty()).then(|| parts.join(" "))
}
