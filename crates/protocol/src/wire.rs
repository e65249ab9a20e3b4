//! Persistent-channel wire format.
//!
//! One JSON object per line in both directions. The engine's first stdout line is
//! `{"ready": true}`; every following line answers the oldest unanswered request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const READY_KEY: &str = "ready";

#[derive(Debug, Clone, Serialize)]
pub struct EngineRequest {
    pub id: u64,
    pub command: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl EngineRequest {
    /// Build a request. Object params are flattened next to `command`; any other non-null
    /// value is sent under `params`.
    pub fn new(id: u64, command: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("params".to_string(), other);
                map
            }
        };
        Self {
            id,
            command: command.into(),
            params,
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// One engine answer.
///
/// Engines are loose about field types: `id` may come back as a string or be missing, and
/// some omit `ok` on success. Anything that parses as an object with `ok` or `data` counts.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EngineResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl EngineResponse {
    /// Read a response from a decoded line without failing on unexpected field types.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let error = match obj.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            id: obj.get("id").filter(|id| !id.is_null()).cloned(),
            ok: obj.get("ok").and_then(Value::as_bool),
            data: obj.get("data").cloned().unwrap_or(Value::Null),
            error,
        }
    }

    /// The reported id when it is a non-negative integer.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// Whether the engine reported success. A missing `ok` is a success unless an error
    /// message came with it.
    pub fn succeeded(&self) -> bool {
        self.ok.unwrap_or(self.error.is_none())
    }

    /// `data` on success, the engine's message otherwise.
    pub fn into_result(self) -> Result<Value, String> {
        if self.succeeded() {
            Ok(self.data)
        } else {
            Err(self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "engine reported failure without a message".to_string()))
        }
    }
}
