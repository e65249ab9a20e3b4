use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn engine '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Engine output did not contain JSON: {0}")]
    UnparsableOutput(String),

    #[error("Engine '{command}' timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("Persistent engine is not running")]
    NotRunning,

    #[error("Persistent engine exited")]
    Exited,

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Transport and timeout failures are recoverable by falling back to a one-shot call.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout { .. } | Self::NotRunning | Self::Exited | Self::Json(_)
        )
    }
}
