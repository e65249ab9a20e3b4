use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod feedback;
pub mod hit;
pub mod wire;

pub use feedback::{FeedbackSignal, RefinementKind};
pub use hit::{normalize_hits, EntityKind, SearchHit};
pub use wire::{EngineRequest, EngineResponse, READY_KEY};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    Blocked,
    Engine,
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Blocked => "blocked",
            Self::Engine => "engine",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
