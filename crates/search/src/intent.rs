//! Caller intents and the boost plans they imply.

use schemars::JsonSchema;
use scout_protocol::{EntityKind, SearchHit};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BOOST: f32 = 0.3;
const STRONG_BOOST: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKind {
    Di,
    Routes,
    System,
    Events,
    Webapi,
    Module,
    Layout,
    Acl,
    Crontab,
    DbSchema,
    Graphql,
}

impl ConfigKind {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Di => "di.xml",
            Self::Routes => "routes.xml",
            Self::System => "system.xml",
            Self::Events => "events.xml",
            Self::Webapi => "webapi.xml",
            Self::Module => "module.xml",
            Self::Layout => ".xml",
            Self::Acl => "acl.xml",
            Self::Crontab => "crontab.xml",
            Self::DbSchema => "db_schema.xml",
            Self::Graphql => "schema.graphqls",
        }
    }

    #[must_use]
    pub const fn file_type(self) -> &'static str {
        match self {
            Self::Graphql => "graphqls",
            _ => "xml",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Di => "di",
            Self::Routes => "routes",
            Self::System => "system",
            Self::Events => "events",
            Self::Webapi => "webapi",
            Self::Module => "module",
            Self::Layout => "layout",
            Self::Acl => "acl",
            Self::Crontab => "crontab",
            Self::DbSchema => "db_schema",
            Self::Graphql => "graphql",
        }
    }

    fn from_file_token(token: &str) -> Option<Self> {
        let kind = match token {
            "di.xml" => Self::Di,
            "routes.xml" => Self::Routes,
            "system.xml" => Self::System,
            "events.xml" => Self::Events,
            "webapi.xml" => Self::Webapi,
            "module.xml" => Self::Module,
            "acl.xml" => Self::Acl,
            "crontab.xml" => Self::Crontab,
            "db_schema.xml" => Self::DbSchema,
            "schema.graphqls" => Self::Graphql,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchIntent {
    General,
    Class,
    Method,
    Plugin,
    Observer,
    Controller,
    Block,
    Model,
    Repository,
    Preference,
    Resolver,
    Api,
    Cron,
    Template,
    Layout,
    Config(ConfigKind),
    DbSchema,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoostTarget {
    PathContains(String),
    Kind(EntityKind),
    FileType(String),
    FileName(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoostRule {
    pub target: BoostTarget,
    pub weight: f32,
}

impl BoostRule {
    pub fn path(substr: impl Into<String>) -> Self {
        Self {
            target: BoostTarget::PathContains(substr.into()),
            weight: DEFAULT_BOOST,
        }
    }

    pub fn kind(kind: EntityKind) -> Self {
        Self {
            target: BoostTarget::Kind(kind),
            weight: DEFAULT_BOOST,
        }
    }

    pub fn file_type(file_type: impl Into<String>) -> Self {
        Self {
            target: BoostTarget::FileType(file_type.into().to_ascii_lowercase()),
            weight: DEFAULT_BOOST,
        }
    }

    pub fn file_name(name: impl Into<String>) -> Self {
        Self {
            target: BoostTarget::FileName(name.into()),
            weight: DEFAULT_BOOST,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn matches(&self, hit: &SearchHit) -> bool {
        match &self.target {
            BoostTarget::PathContains(substr) => hit.path.contains(substr.as_str()),
            BoostTarget::Kind(kind) => hit.has_kind(*kind),
            BoostTarget::FileType(file_type) => {
                hit.effective_file_type().as_deref() == Some(file_type.as_str())
            }
            BoostTarget::FileName(name) => {
                hit.file_name().eq_ignore_ascii_case(name)
                    || (name.starts_with('.') && hit.file_name().ends_with(name.as_str()))
            }
        }
    }
}

/// Boost rules plus an optional expected file type (hits of other types are penalized).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoostPlan {
    pub rules: Vec<BoostRule>,
    pub expected_file_type: Option<String>,
}

impl BoostPlan {
    #[must_use]
    pub fn with_rule(mut self, rule: BoostRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = BoostRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    #[must_use]
    pub fn expecting(mut self, file_type: impl Into<String>) -> Self {
        self.expected_file_type = Some(file_type.into().to_ascii_lowercase());
        self
    }
}

impl SearchIntent {
    #[must_use]
    pub fn boost_plan(&self) -> BoostPlan {
        let plan = BoostPlan::default();
        match *self {
            Self::General => plan,
            Self::Class | Self::Method => plan.with_rule(BoostRule::file_type("php")),
            Self::Plugin => plan.with_rules([
                BoostRule::kind(EntityKind::Plugin),
                BoostRule::path(EntityKind::Plugin.path_marker()),
                BoostRule::file_name("di.xml"),
            ]),
            Self::Observer => plan.with_rules([
                BoostRule::kind(EntityKind::Observer),
                BoostRule::path(EntityKind::Observer.path_marker()),
                BoostRule::file_name("events.xml"),
            ]),
            Self::Controller => plan.with_rules([
                BoostRule::kind(EntityKind::Controller),
                BoostRule::path(EntityKind::Controller.path_marker()),
            ]),
            Self::Block => plan.with_rules([
                BoostRule::kind(EntityKind::Block),
                BoostRule::path(EntityKind::Block.path_marker()),
            ]),
            Self::Model => plan.with_rules([
                BoostRule::kind(EntityKind::Model),
                BoostRule::path(EntityKind::Model.path_marker()),
            ]),
            Self::Repository => plan.with_rules([
                BoostRule::kind(EntityKind::Repository),
                BoostRule::path(EntityKind::Repository.path_marker()),
            ]),
            Self::Preference => plan
                .with_rule(BoostRule::file_name("di.xml").with_weight(STRONG_BOOST))
                .expecting("xml"),
            Self::Resolver => plan.with_rules([
                BoostRule::kind(EntityKind::Resolver),
                BoostRule::path(EntityKind::Resolver.path_marker()),
                BoostRule::file_name("schema.graphqls"),
            ]),
            Self::Api => plan.with_rules([
                BoostRule::file_name("webapi.xml").with_weight(STRONG_BOOST),
                BoostRule::path("/Api/"),
            ]),
            Self::Cron => plan.with_rules([
                BoostRule::file_name("crontab.xml"),
                BoostRule::path("/Cron/"),
            ]),
            Self::Template => plan
                .with_rules([BoostRule::file_type("phtml"), BoostRule::path("/templates/")])
                .expecting("phtml"),
            Self::Layout => plan.with_rule(BoostRule::path("/layout/")).expecting("xml"),
            Self::Config(kind) => {
                let plan = plan.with_rule(BoostRule::path("/etc/"));
                let plan = match kind {
                    ConfigKind::Layout => plan.with_rule(BoostRule::path("/layout/")),
                    other => {
                        let rule = BoostRule::file_name(other.file_name());
                        plan.with_rule(rule.with_weight(STRONG_BOOST))
                    }
                };
                plan.expecting(kind.file_type())
            }
            Self::DbSchema => plan
                .with_rule(BoostRule::file_name("db_schema.xml").with_weight(STRONG_BOOST))
                .expecting("xml"),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Class => "class",
            Self::Method => "method",
            Self::Plugin => "plugin",
            Self::Observer => "observer",
            Self::Controller => "controller",
            Self::Block => "block",
            Self::Model => "model",
            Self::Repository => "repository",
            Self::Preference => "preference",
            Self::Resolver => "resolver",
            Self::Api => "api",
            Self::Cron => "cron",
            Self::Template => "template",
            Self::Layout => "layout",
            Self::Config(_) => "config",
            Self::DbSchema => "db_schema",
        }
    }
}

/// Best-guess intent for a free-text query.
///
/// Explicit config file names win; then the first matching keyword in a fixed priority order.
#[must_use]
pub fn infer_intent(query: &str) -> SearchIntent {
    let lower = query.to_ascii_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == ',' || c == '?' || c == '"')
        .filter(|t| !t.is_empty())
        .collect();

    for token in &tokens {
        if let Some(kind) = ConfigKind::from_file_token(token) {
            return match kind {
                ConfigKind::DbSchema => SearchIntent::DbSchema,
                other => SearchIntent::Config(other),
            };
        }
    }
    if tokens.iter().any(|t| t.ends_with(".phtml")) {
        return SearchIntent::Template;
    }

    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));
    const KEYWORDS: &[(&[&str], SearchIntent)] = &[
        (&["plugin", "plugins", "interceptor", "interceptors"], SearchIntent::Plugin),
        (&["observer", "observers", "event", "events"], SearchIntent::Observer),
        (&["preference", "preferences"], SearchIntent::Preference),
        (&["resolver", "resolvers", "graphql", "mutation"], SearchIntent::Resolver),
        (&["webapi", "rest", "api"], SearchIntent::Api),
        (&["cron", "crontab", "schedule"], SearchIntent::Cron),
        (&["template", "templates", "phtml"], SearchIntent::Template),
        (&["layout", "handle"], SearchIntent::Layout),
        (&["controller", "controllers", "action"], SearchIntent::Controller),
        (&["block", "blocks", "viewmodel"], SearchIntent::Block),
        (&["repository", "repositories"], SearchIntent::Repository),
        (&["table", "column", "schema"], SearchIntent::DbSchema),
        (&["model", "models"], SearchIntent::Model),
    ];
    for (words, intent) in KEYWORDS {
        if has(words) {
            return *intent;
        }
    }
    SearchIntent::General
}
