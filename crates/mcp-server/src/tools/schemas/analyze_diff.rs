use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeDiffRequest {
    #[schemars(description = "Commit to analyze (default: HEAD)")]
    pub commit_hash: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct ChangedFile {
    /// git status letter (A, M, D, R...)
    pub status: String,
    pub path: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct AnalyzeDiffResult {
    pub commit: String,
    pub files: Vec<ChangedFile>,
}
