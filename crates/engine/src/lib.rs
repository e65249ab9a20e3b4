//! Process-level access to the embedding engine.
//!
//! - [`EngineClient`]: one blocking invocation per operation (index, stats, cold search).
//! - [`EngineSupervisor`]: a persistent `serve` process multiplexed over one line channel.
//! - [`EngineGateway`]: the [`Engine`] implementation that prefers the persistent channel and
//!   falls back to one-shot calls on transport failures.

mod client;
mod config;
mod error;
mod framing;
mod gateway;
mod output;
mod supervisor;

pub use client::EngineClient;
pub use config::{
    EngineConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_INDEX_TIMEOUT, DEFAULT_ONESHOT_TIMEOUT,
    DEFAULT_READY_TIMEOUT,
};
pub use error::{EngineError, Result};
pub use framing::{decode_frame, EngineFrame, EngineFrames};
pub use gateway::{Engine, EngineGateway};
pub use output::{is_diagnostic_line, parse_engine_output, strip_diagnostics};
pub use supervisor::{EngineSupervisor, Readiness};
