use rmcp::schemars;
use scout_search::RankedHit;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Free-text query
    #[schemars(description = "Natural language or identifier query; the intent is inferred from keywords")]
    pub query: String,

    /// Maximum results (default: 10)
    #[schemars(description = "Maximum number of results (1-50, default 10)")]
    pub limit: Option<usize>,
}

/// Payload shared by `search` and every `find_*` tool.
#[derive(Debug, Serialize)]
pub struct HitsResult {
    /// Query text sent to the engine
    pub query: String,
    /// Intent used for re-ranking
    pub intent: String,
    pub hits: Vec<RankedHit>,
}
