use rmcp::schemars;
use scout_search::ConfigKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindClassRequest {
    #[schemars(description = "Class name, short (`CartRepository`) or fully qualified")]
    pub class_name: String,
    #[schemars(description = "Optional namespace prefix, e.g. `Magento\\Quote\\Model`")]
    pub namespace: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindMethodRequest {
    #[schemars(description = "Method name, e.g. `getItems`")]
    pub method_name: String,
    #[schemars(description = "Optional declaring class")]
    pub class_name: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindConfigRequest {
    #[schemars(description = "What to look for inside configuration files")]
    pub query: String,
    #[schemars(description = "Configuration kind: di, routes, system, events, webapi, module, layout, acl, crontab, db_schema, graphql")]
    pub config_type: Option<ConfigKind>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindTemplateRequest {
    pub query: String,
    #[schemars(description = "Optional area: frontend, adminhtml or base")]
    pub area: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindPluginRequest {
    #[schemars(description = "Intercepted class, e.g. `Magento\\Catalog\\Model\\Product`")]
    pub target_class: String,
    #[schemars(description = "Optional intercepted method")]
    pub target_method: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindObserverRequest {
    #[schemars(description = "Event name, e.g. `sales_order_place_after`")]
    pub event_name: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindPreferenceRequest {
    #[schemars(description = "Interface or class whose preference (DI override) to find")]
    pub interface_name: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindApiRequest {
    #[schemars(description = "Route or service to look for, e.g. `/V1/carts/mine`")]
    pub query: String,
    #[schemars(description = "Optional HTTP method")]
    pub method: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindControllerRequest {
    #[schemars(description = "Route as frontName/controller/action, e.g. `checkout/cart/add`")]
    pub route: String,
    #[schemars(description = "Optional area: frontend or adminhtml")]
    pub area: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindQueryRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindCronRequest {
    #[schemars(description = "Cron job name or code")]
    pub job_name: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindDbSchemaRequest {
    #[schemars(description = "Table name, e.g. `quote_item`")]
    pub table_name: String,
    pub limit: Option<usize>,
}
