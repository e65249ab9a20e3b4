//! Scout MCP tool surface.
//!
//! Request schemas, dispatch and per-tool implementations live in separate submodules.

mod context_doc;
mod dispatch;
mod schemas;

pub use dispatch::ScoutService;
