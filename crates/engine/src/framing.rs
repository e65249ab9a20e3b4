//! Line framing for the persistent engine channel.
//!
//! [`EngineFrames`] turns the engine's stdout into a pull-based sequence of decoded frames.
//! It does no correlation itself: the supervisor pairs each [`EngineFrame::Response`] with
//! the oldest pending call, which is only sound while the engine answers in request order.

use scout_protocol::{EngineResponse, READY_KEY};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineFrame {
    Ready,
    Response(EngineResponse),
    /// A non-empty line that is not a protocol message. Carries the raw line.
    Malformed(String),
}

pub struct EngineFrames<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> EngineFrames<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next frame, or `None` at end of stream. Blank lines are skipped.
    pub async fn next_frame(&mut self) -> std::io::Result<Option<EngineFrame>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(decode_frame(&line)));
        }
    }
}

pub fn decode_frame(line: &str) -> EngineFrame {
    let trimmed = line.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return EngineFrame::Malformed(trimmed.to_string());
    };
    let Some(obj) = value.as_object() else {
        return EngineFrame::Malformed(trimmed.to_string());
    };

    let is_response = obj.contains_key("ok") || obj.contains_key("data");
    if !is_response {
        return match obj.get(READY_KEY).and_then(Value::as_bool) {
            Some(true) => EngineFrame::Ready,
            _ => EngineFrame::Malformed(trimmed.to_string()),
        };
    }

    EngineFrame::Response(EngineResponse::from_object(obj))
}
