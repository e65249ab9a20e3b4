//! Parsing of one-shot engine stdout.
//!
//! The engine may interleave progress and log lines with the JSON payload, so the payload is
//! located rather than assumed to be the whole output.

use crate::error::{EngineError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const PREVIEW_CHARS: usize = 240;

static DIAGNOSTIC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^\s*(?:
            \[?\d{4}-\d{2}-\d{2}[T\ ]\d{2}:\d{2}      # timestamp prefix
          | \[\s*\d+(?:\.\d+)?\s*m?s\s*\]             # elapsed-time prefix
          | \[?(?:TRACE|DEBUG|INFO|WARN|WARNING|ERROR)\b
          | (?:Loading|Indexing|Embedding|Processing|Scanning)\b
        )",
    )
    .expect("diagnostic line regex is valid")
});

/// Extract the JSON payload from engine stdout.
pub fn parse_engine_output(stdout: &str) -> Result<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(EngineError::UnparsableOutput("empty output".to_string()));
    }

    if let Some(value) = parse_payload(trimmed) {
        return Ok(value);
    }

    for line in trimmed.lines().rev() {
        if let Some(value) = parse_payload(line.trim()) {
            return Ok(value);
        }
    }

    let cleaned = strip_diagnostics(trimmed);
    parse_payload(cleaned.trim()).ok_or_else(|| EngineError::UnparsableOutput(preview(trimmed)))
}

/// Drop lines that look like timestamps, log levels or progress chatter.
pub fn strip_diagnostics(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_diagnostic_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn is_diagnostic_line(line: &str) -> bool {
    DIAGNOSTIC_LINE.is_match(line)
}

fn parse_payload(text: &str) -> Option<Value> {
    if !(text.starts_with('{') || text.starts_with('[')) {
        return None;
    }
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
}

fn preview(text: &str) -> String {
    let tail: String = text
        .chars()
        .rev()
        .take(PREVIEW_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if tail.len() < text.len() {
        format!("…{tail}")
    } else {
        tail
    }
}
