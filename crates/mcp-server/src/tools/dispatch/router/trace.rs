use super::error::internal_error;
use super::search::required;
use crate::tools::context_doc::ContextDocBuilder;
use crate::tools::dispatch::{ScoutService, ToolOutcome, ToolOutput};
use crate::tools::schemas::trace::TraceFlowRequest;
use scout_search::{TraceHit, TraceResult};

pub(in crate::tools::dispatch) async fn trace_flow(
    service: &ScoutService,
    request: TraceFlowRequest,
) -> ToolOutcome {
    let entry_point = required(&request.entry_point, "entryPoint")?;
    let result = service
        .state()
        .tracer
        .trace(entry_point, request.entry_type, request.depth.unwrap_or_default())
        .await;

    let doc = render(&result);
    let result_paths = stages(&result)
        .flat_map(|(_, hits)| hits.iter().map(|hit| hit.path.clone()))
        .collect();
    let structured = serde_json::to_value(&result)
        .map_err(|err| internal_error(format!("failed to serialize trace ({err})")))?;
    Ok(ToolOutput {
        doc,
        structured,
        result_paths,
    })
}

fn stages(result: &TraceResult) -> impl Iterator<Item = (&'static str, &[TraceHit])> {
    [
        ("handler", result.handler.as_slice()),
        ("config", result.config.as_slice()),
        ("plugins", result.plugins.as_slice()),
        ("observers", result.observers.as_slice()),
        ("preferences", result.preferences.as_slice()),
        ("layout", result.layout.as_slice()),
        ("templates", result.templates.as_slice()),
    ]
    .into_iter()
}

fn render(result: &TraceResult) -> ContextDocBuilder {
    let mut doc = ContextDocBuilder::new();
    doc.push_answer(&result.summary);
    for (stage, hits) in stages(result) {
        if hits.is_empty() {
            continue;
        }
        doc.push_blank();
        doc.push_line(&format!("{stage}:"));
        for hit in hits {
            doc.push_ref(&hit.path, hit.score, Some(&hit.identifier()));
        }
    }
    if result.handler.is_empty() && result.observers.is_empty() {
        doc.push_note(&format!(
            "no handler found for '{}' ({}); try find_controller or search",
            result.entry_point,
            result.entry_type.label()
        ));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_search::{EntryType, TraceDepth};

    #[test]
    fn renders_only_populated_stages() {
        let mut result =
            TraceResult::empty("checkout/cart/add", EntryType::Route, TraceDepth::Shallow);
        result.handler.push(TraceHit {
            path: "app/code/V/C/Controller/Cart/Add.php".to_string(),
            class_name: Some("V\\C\\Controller\\Cart\\Add".to_string()),
            method_name: Some("execute".to_string()),
            score: 1.5,
        });
        result.summary = "Route checkout/cart/add".to_string();

        let text = render(&result).finish();
        assert!(text.contains("A: Route checkout/cart/add"));
        assert!(text.contains(
            "handler:\nR: app/code/V/C/Controller/Cart/Add.php 1.500 V\\C\\Controller\\Cart\\Add::execute"
        ));
        assert!(!text.contains("plugins:"));
        assert!(!text.contains("N: no handler"));
    }

    #[test]
    fn notes_missing_handler() {
        let result = TraceResult::empty("placeOrder", EntryType::Graphql, TraceDepth::Deep);
        let text = render(&result).finish();
        assert!(text.contains("N: no handler found for 'placeOrder' (GraphQL)"));
    }
}
