//! Multi-hop tracing from an entry point (route, API path, GraphQL field, event, cron job)
//! to its handler, configuration, interceptors and listeners.

mod classify;
mod plan;
mod summary;

pub use classify::{classify, EntryType};
pub use plan::route_controller_marker;
pub use summary::summarize;

use crate::intent::{BoostRule, SearchIntent};
use crate::pipeline::SearchPipeline;
use crate::rerank::RankedHit;
use plan::{class_from_path, short_class, StageQuery, TracePlan};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_STAGE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TraceDepth {
    #[default]
    Shallow,
    Deep,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceHit {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    pub score: f32,
}

impl TraceHit {
    fn from_ranked(ranked: RankedHit, default_method: Option<&str>) -> Self {
        let class_name = ranked
            .hit
            .class_name
            .clone()
            .or_else(|| class_from_path(&ranked.hit.path));
        let method_name = ranked
            .hit
            .method_name
            .clone()
            .or_else(|| class_name.as_ref().and(default_method.map(str::to_string)));
        Self {
            path: ranked.hit.path,
            class_name,
            method_name,
            score: ranked.score,
        }
    }

    /// `Class::method`, `Class`, or the path when no class is known.
    #[must_use]
    pub fn identifier(&self) -> String {
        match (self.class_name.as_deref(), self.method_name.as_deref()) {
            (Some(class), Some(method)) => format!("{class}::{method}"),
            (Some(class), None) => class.to_string(),
            _ => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResult {
    pub entry_point: String,
    pub entry_type: EntryType,
    pub depth: TraceDepth,
    pub handler: Vec<TraceHit>,
    pub config: Vec<TraceHit>,
    pub plugins: Vec<TraceHit>,
    pub observers: Vec<TraceHit>,
    pub preferences: Vec<TraceHit>,
    pub layout: Vec<TraceHit>,
    pub templates: Vec<TraceHit>,
    pub summary: String,
}

impl TraceResult {
    pub fn empty(entry_point: impl Into<String>, entry_type: EntryType, depth: TraceDepth) -> Self {
        Self {
            entry_point: entry_point.into(),
            entry_type,
            depth,
            handler: Vec::new(),
            config: Vec::new(),
            plugins: Vec::new(),
            observers: Vec::new(),
            preferences: Vec::new(),
            layout: Vec::new(),
            templates: Vec::new(),
            summary: String::new(),
        }
    }

    /// Class of the resolved handler (or first observer for events).
    #[must_use]
    pub fn handler_class(&self) -> Option<&str> {
        self.handler
            .first()
            .or_else(|| self.observers.first())
            .and_then(|hit| hit.class_name.as_deref())
    }
}

pub struct TraceEngine {
    pipeline: Arc<SearchPipeline>,
    stage_limit: usize,
}

impl TraceEngine {
    pub fn new(pipeline: Arc<SearchPipeline>) -> Self {
        Self {
            pipeline,
            stage_limit: DEFAULT_STAGE_LIMIT,
        }
    }

    #[must_use]
    pub fn with_stage_limit(mut self, stage_limit: usize) -> Self {
        self.stage_limit = stage_limit.max(1);
        self
    }

    /// Run the per-type plan. Never fails: unresolved stages stay empty.
    pub async fn trace(
        &self,
        entry_point: &str,
        entry_type: Option<EntryType>,
        depth: TraceDepth,
    ) -> TraceResult {
        let entry_point = entry_point.trim();
        let entry_type = entry_type.unwrap_or_else(|| classify(entry_point));
        let plan = TracePlan::build(entry_point, entry_type);
        let mut result = TraceResult::empty(entry_point, entry_type, depth);

        log::debug!(
            "Trace: entry='{}', type={:?}, depth={:?}",
            entry_point,
            entry_type,
            depth
        );

        // The primary handler (observers, for events) and every stage that does not need its
        // class run together.
        let deep = depth == TraceDepth::Deep;
        let related_query = plan
            .related_event
            .as_deref()
            .filter(|_| deep)
            .map(observer_query);
        let (primary, config, related, layout, templates) = tokio::join!(
            self.stage("primary", &plan.primary, plan.default_method, false),
            self.stage("config", &plan.config, None, true),
            self.optional_stage("related observers", related_query.as_ref()),
            self.optional_stage("layout", plan.layout.as_ref().filter(|_| deep)),
            self.optional_stage("templates", plan.templates.as_ref().filter(|_| deep)),
        );
        if entry_type == EntryType::Event {
            result.observers = primary;
        } else {
            result.handler = primary.into_iter().take(1).collect();
        }
        let handler_class = result.handler_class().map(str::to_string);
        result.config = config;
        result.layout = layout;
        result.templates = templates;
        for hit in related {
            if !result.observers.iter().any(|o| o.path == hit.path) {
                result.observers.push(hit);
            }
        }

        // Interceptors and preferences on the handler class.
        let plugin_query = handler_class.as_deref().map(plugin_query);
        let preference_query = handler_class
            .as_deref()
            .filter(|_| deep)
            .map(preference_query);
        let (plugins, preferences) = tokio::join!(
            self.optional_stage("plugins", plugin_query.as_ref()),
            self.optional_stage("preferences", preference_query.as_ref()),
        );
        result.plugins = plugins;
        result.preferences = preferences;

        result.summary = summarize(&result);
        result
    }

    /// Primary stages keep every ranked hit; secondary stages keep only hits that match at
    /// least one of their boost rules.
    async fn stage(
        &self,
        name: &str,
        query: &StageQuery,
        default_method: Option<&str>,
        strict: bool,
    ) -> Vec<TraceHit> {
        match self
            .pipeline
            .search(&query.query, self.stage_limit, &query.plan)
            .await
        {
            Ok(hits) => hits
                .into_iter()
                .filter(|ranked| {
                    !strict || query.plan.rules.iter().any(|r| r.matches(&ranked.hit))
                })
                .map(|ranked| TraceHit::from_ranked(ranked, default_method))
                .collect(),
            Err(err) => {
                log::warn!("Trace stage '{}' failed: {}", name, err);
                Vec::new()
            }
        }
    }

    async fn optional_stage(&self, name: &str, query: Option<&StageQuery>) -> Vec<TraceHit> {
        match query {
            Some(query) => self.stage(name, query, None, true).await,
            None => Vec::new(),
        }
    }
}

fn plugin_query(class: &str) -> StageQuery {
    let mut plan = SearchIntent::Plugin.boost_plan();
    plan.rules.push(BoostRule::path(format!("/Plugin/{}", short_class(class))));
    StageQuery {
        query: format!("plugin interceptor for {class} {}", short_class(class)),
        plan,
    }
}

fn preference_query(class: &str) -> StageQuery {
    StageQuery {
        query: format!("preference for {class}"),
        plan: SearchIntent::Preference.boost_plan(),
    }
}

fn observer_query(event: &str) -> StageQuery {
    StageQuery {
        query: format!("observer for event {event}"),
        plan: SearchIntent::Observer.boost_plan(),
    }
}
