use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct IndexRequest {
    /// Source root to index
    #[schemars(description = "Source root to index (default: SCOUT_ROOT or the server's working directory)")]
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct StatsRequest {}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct StatsResult {
    /// Engine-reported statistics (absent when the engine could not be reached)
    pub engine: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_error: Option<String>,
    /// Index compatibility state: unchecked, compatible, incompatible, rebuilding
    pub index_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rebuild_error: Option<String>,
    pub cache_entries: usize,
    pub persistent_engine: bool,
}
