//! Per-entry-type search plans.

use super::classify::EntryType;
use crate::intent::{BoostPlan, BoostRule, ConfigKind, SearchIntent};

const PATH_MATCH_BOOST: f32 = 0.6;

#[derive(Debug, Clone)]
pub(crate) struct StageQuery {
    pub query: String,
    pub plan: BoostPlan,
}

impl StageQuery {
    fn new(query: impl Into<String>, intent: SearchIntent) -> Self {
        Self {
            query: query.into(),
            plan: intent.boost_plan(),
        }
    }

    fn boost(mut self, rule: BoostRule) -> Self {
        self.plan.rules.push(rule);
        self
    }
}

/// Queries that only depend on the entry point. Handler-dependent stages are built later
/// from the resolved handler class.
#[derive(Debug, Clone)]
pub(crate) struct TracePlan {
    pub primary: StageQuery,
    pub config: StageQuery,
    /// Default method name for the handler (`execute` for controllers and cron jobs).
    pub default_method: Option<&'static str>,
    pub related_event: Option<String>,
    pub layout: Option<StageQuery>,
    pub templates: Option<StageQuery>,
}

impl TracePlan {
    pub(crate) fn build(entry: &str, entry_type: EntryType) -> Self {
        let entry = entry.trim();
        match entry_type {
            EntryType::Route => route_plan(entry),
            EntryType::Api => api_plan(entry),
            EntryType::Graphql => Self {
                primary: StageQuery::new(
                    format!("graphql resolver {entry}"),
                    SearchIntent::Resolver,
                ),
                config: StageQuery::new(
                    format!("schema.graphqls {entry}"),
                    SearchIntent::Config(ConfigKind::Graphql),
                ),
                default_method: Some("resolve"),
                related_event: None,
                layout: None,
                templates: None,
            },
            EntryType::Event => Self {
                primary: StageQuery::new(
                    format!("observer for event {entry}"),
                    SearchIntent::Observer,
                ),
                config: StageQuery::new(
                    format!("events.xml event {entry}"),
                    SearchIntent::Config(ConfigKind::Events),
                ),
                default_method: Some("execute"),
                related_event: None,
                layout: None,
                templates: None,
            },
            EntryType::Cron => {
                let job = entry.split_whitespace().find(|t| *t != "cron").unwrap_or(entry);
                Self {
                    primary: StageQuery::new(format!("cron job {job} execute"), SearchIntent::Cron),
                    config: StageQuery::new(
                        format!("crontab.xml job {job}"),
                        SearchIntent::Config(ConfigKind::Crontab),
                    ),
                    default_method: Some("execute"),
                    related_event: None,
                    layout: None,
                    templates: None,
                }
            }
        }
    }
}

/// `front/controller/action`, with missing parts defaulting to `index`.
fn route_parts(route: &str) -> (&str, &str, &str) {
    let mut segments = route.trim_matches('/').split('/').filter(|s| !s.is_empty());
    let front = segments.next().unwrap_or(route);
    let controller = segments.next().unwrap_or("index");
    let action = segments.next().unwrap_or("index");
    (front, controller, action)
}

/// Directory marker of the controller class that serves a route: `checkout/cart/add` ->
/// `/Controller/Cart/Add`.
pub fn route_controller_marker(route: &str) -> String {
    let (_, controller, action) = route_parts(route);
    format!("/Controller/{}/{}", pascal(controller), pascal(action))
}

fn route_plan(entry: &str) -> TracePlan {
    let (front, controller, action) = route_parts(entry);
    let handle = format!("{front}_{controller}_{action}").to_ascii_lowercase();
    let controller_path = route_controller_marker(entry);

    TracePlan {
        primary: StageQuery::new(
            format!("{front} {controller} {action} controller execute"),
            SearchIntent::Controller,
        )
        .boost(BoostRule::path(controller_path).with_weight(PATH_MATCH_BOOST)),
        config: StageQuery::new(
            format!("routes.xml frontName {front}"),
            SearchIntent::Config(ConfigKind::Routes),
        ),
        default_method: Some("execute"),
        related_event: Some(format!("controller_action_predispatch_{handle}")),
        layout: Some(
            StageQuery::new(format!("layout handle {handle}"), SearchIntent::Layout)
                .boost(BoostRule::file_name(format!("{handle}.xml")).with_weight(PATH_MATCH_BOOST)),
        ),
        templates: Some(StageQuery::new(
            format!("{front} {controller} {action} template"),
            SearchIntent::Template,
        )),
    }
}

fn api_plan(entry: &str) -> TracePlan {
    let route = entry
        .split_whitespace()
        .last()
        .unwrap_or(entry)
        .to_string();
    let words: Vec<&str> = route
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with(':') && !is_version(s))
        .collect();
    TracePlan {
        primary: StageQuery::new(
            format!("service contract {} api interface", words.join(" ")),
            SearchIntent::Api,
        ),
        config: StageQuery::new(
            format!("webapi.xml route {route}"),
            SearchIntent::Config(ConfigKind::Webapi),
        ),
        default_method: None,
        related_event: None,
        layout: None,
        templates: None,
    }
}

fn is_version(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some('V' | 'v'))
        && chars.clone().next().is_some()
        && chars.all(|c| c.is_ascii_digit())
}

/// `cart` -> `Cart`, `add_item` -> `AddItem`.
pub(crate) fn pascal(segment: &str) -> String {
    segment
        .split(['_', '-'])
        .filter(|p| !p.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Class name for a PHP source path under `app/code` or a composer `vendor/` package.
pub(crate) fn class_from_path(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let stem = normalized.strip_suffix(".php")?;

    let relative = if let Some(idx) = stem.find("app/code/") {
        stem[idx + "app/code/".len()..].to_string()
    } else if let Some(idx) = stem.find("vendor/") {
        let mut parts = stem[idx + "vendor/".len()..].splitn(3, '/');
        let org = parts.next()?;
        let package = parts.next()?;
        let rest = parts.next()?;
        let package = package.strip_prefix("module-").unwrap_or(package);
        format!("{}/{}/{}", pascal(org), pascal(package), rest)
    } else {
        stem.to_string()
    };

    let class = relative
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\\");
    (!class.is_empty()).then_some(class)
}

pub(crate) fn short_class(class: &str) -> &str {
    class.rsplit('\\').next().unwrap_or(class)
}
