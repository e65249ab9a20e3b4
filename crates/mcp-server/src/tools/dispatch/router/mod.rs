// Per-tool bodies used by the MCP tool router.

pub(super) mod analyze_diff;
pub(super) mod error;
pub(super) mod find;
pub(super) mod index;
pub(super) mod module_structure;
pub(super) mod search;
pub(super) mod trace;
mod tool_router;

pub(super) fn build_tool_router() -> rmcp::handler::server::tool::ToolRouter<super::ScoutService> {
    tool_router::build_tool_router()
}
