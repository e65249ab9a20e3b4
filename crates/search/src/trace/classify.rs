use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

static VERSIONED_API: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[A-Z]+\s+)?/?V\d+/").expect("valid api regex"));
static SNAKE_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*(?:_[a-z0-9]+)+$").expect("valid event regex"));
static MIXED_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid graphql regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Route,
    Api,
    Graphql,
    Event,
    Cron,
}

impl EntryType {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Route => "Route",
            Self::Api => "API",
            Self::Graphql => "GraphQL",
            Self::Event => "Event",
            Self::Cron => "Cron",
        }
    }
}

/// Guess the entry type from the shape of the entry point.
///
/// Version-prefixed paths are API routes even when they mention cron; otherwise a cron or
/// `_job` mention wins over the remaining shape rules. Anything unrecognized is a route.
#[must_use]
pub fn classify(entry: &str) -> EntryType {
    let entry = entry.trim();
    if VERSIONED_API.is_match(entry) {
        return EntryType::Api;
    }
    let lower = entry.to_ascii_lowercase();
    if lower.contains("cron") || lower.contains("_job") {
        return EntryType::Cron;
    }
    if entry.contains('/') {
        return EntryType::Route;
    }
    if SNAKE_CASE.is_match(entry) {
        return EntryType::Event;
    }
    if MIXED_CASE.is_match(entry) && entry.chars().any(|c| c.is_ascii_uppercase()) {
        return EntryType::Graphql;
    }
    EntryType::Route
}
