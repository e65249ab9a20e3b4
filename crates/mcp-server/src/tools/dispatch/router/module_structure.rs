use super::error::{internal_error, invalid_request, search_error};
use super::search::required;
use crate::tools::context_doc::ContextDocBuilder;
use crate::tools::dispatch::{ScoutService, ToolOutcome, ToolOutput};
use crate::tools::schemas::module_structure::{ModuleStructureRequest, ModuleStructureResult};
use scout_protocol::SearchHit;
use scout_search::{BoostPlan, BoostRule};
use std::collections::BTreeMap;

const MODULE_SCAN_LIMIT: usize = 50;

/// Path markers for a `Vendor_Module` name: `app/code` layout and composer package layout.
#[derive(Debug, PartialEq)]
struct ModuleMarkers {
    app_code: String,
    composer: String,
}

impl ModuleMarkers {
    fn parse(module_name: &str) -> Option<Self> {
        let (vendor, module) = module_name.split_once('_')?;
        if vendor.is_empty() || module.is_empty() || module.contains('_') {
            return None;
        }
        Some(Self {
            app_code: format!("{vendor}/{module}/"),
            composer: format!(
                "{}/module-{}/",
                vendor.to_ascii_lowercase(),
                kebab(module)
            ),
        })
    }

    fn contains(&self, hit: &SearchHit, module_name: &str) -> bool {
        let path = hit.path.replace('\\', "/");
        path.contains(&self.app_code)
            || path.contains(&self.composer)
            || hit.module.as_deref() == Some(module_name)
    }
}

/// `CatalogInventory` -> `catalog-inventory`.
fn kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn group_of(hit: &SearchHit) -> &'static str {
    if let Some(kind) = hit.kinds().next() {
        return kind.label();
    }
    let path = hit.path.replace('\\', "/");
    match hit.effective_file_type().as_deref() {
        Some("phtml") => "template",
        Some("xml") if path.contains("/layout/") => "layout",
        Some("xml" | "graphqls") => "config",
        _ => "other",
    }
}

pub(in crate::tools::dispatch) async fn module_structure(
    service: &ScoutService,
    request: ModuleStructureRequest,
) -> ToolOutcome {
    let module_name = required(&request.module_name, "moduleName")?;
    let markers = ModuleMarkers::parse(module_name).ok_or_else(|| {
        invalid_request(format!(
            "Module name must look like `Vendor_Module`, got `{module_name}`"
        ))
    })?;

    let (vendor, module) = module_name.split_once('_').unwrap_or((module_name, ""));
    let plan = BoostPlan::default()
        .with_rule(BoostRule::path(markers.app_code.clone()).with_weight(0.6))
        .with_rule(BoostRule::path(markers.composer.clone()).with_weight(0.6));
    let hits = service
        .state()
        .pipeline
        .search(&format!("{vendor} {module} module"), MODULE_SCAN_LIMIT, &plan)
        .await
        .map_err(|err| search_error(&err))?;

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for ranked in hits.iter().filter(|r| markers.contains(&r.hit, module_name)) {
        groups
            .entry(group_of(&ranked.hit).to_string())
            .or_default()
            .push(ranked.hit.path.clone());
    }

    let mut doc = ContextDocBuilder::new();
    let total: usize = groups.values().map(Vec::len).sum();
    doc.push_answer(&format!(
        "{module_name}: {total} file(s) in {} group(s)",
        groups.len()
    ));
    for (group, paths) in &groups {
        doc.push_blank();
        doc.push_line(&format!("{group}:"));
        for path in paths {
            doc.push_line(&format!("R: {path}"));
        }
    }
    if groups.is_empty() {
        doc.push_note("no indexed files belong to this module");
    }

    let result_paths = groups.values().flatten().cloned().collect();
    let payload = ModuleStructureResult {
        module: module_name.to_string(),
        groups,
    };
    let structured = serde_json::to_value(&payload)
        .map_err(|err| internal_error(format!("failed to serialize module structure ({err})")))?;
    Ok(ToolOutput {
        doc,
        structured,
        result_paths,
    })
}
