use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStructureRequest {
    #[schemars(description = "Module name as `Vendor_Module`")]
    pub module_name: String,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct ModuleStructureResult {
    pub module: String,
    /// Paths grouped by kind (plugin, controller, config, template, ...)
    pub groups: BTreeMap<String, Vec<String>>,
}
