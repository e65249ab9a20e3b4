use rmcp::schemars;
use scout_search::{EntryType, TraceDepth};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TraceFlowRequest {
    #[schemars(description = "Entry point: route (`checkout/cart/add`), API path (`/V1/carts/mine`), GraphQL field (`placeOrder`), event (`sales_order_place_after`) or cron job")]
    pub entry_point: String,

    #[schemars(description = "Entry type override: route, api, graphql, event, cron (default: inferred)")]
    pub entry_type: Option<EntryType>,

    #[schemars(description = "`shallow` (default): handler, config, plugins. `deep`: also preferences, related observers, layout and templates")]
    pub depth: Option<TraceDepth>,
}
