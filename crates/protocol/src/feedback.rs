use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementKind {
    QueryRefinement,
    RefinedToPlugin,
    RefinedToClass,
    RefinedToConfig,
    RefinedToObserver,
    RefinedToController,
    RefinedToBlock,
    RefinedToTrace,
}

impl RefinementKind {
    /// Refinement type for a specialized follow-up tool, if it is one.
    #[must_use]
    pub fn for_follow_up(tool: &str) -> Option<Self> {
        match tool {
            "find_plugin" => Some(Self::RefinedToPlugin),
            "find_class" => Some(Self::RefinedToClass),
            "find_config" => Some(Self::RefinedToConfig),
            "find_observer" => Some(Self::RefinedToObserver),
            "find_controller" => Some(Self::RefinedToController),
            "find_block" => Some(Self::RefinedToBlock),
            "trace_flow" => Some(Self::RefinedToTrace),
            _ => None,
        }
    }
}

/// Implicit relevance signal sent back to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSignal {
    #[serde(rename = "type")]
    pub kind: RefinementKind,
    pub query: String,
    pub result_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_args: Option<Value>,
    pub timestamp_ms: u64,
}
