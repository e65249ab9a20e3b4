//! Canonical search hit shape.
//!
//! The engine reports hits with loosely-typed metadata (camelCase or snake_case keys, flat or
//! nested under `metadata`, `distance` or `score`). Everything downstream works on
//! [`SearchHit`], produced once by [`SearchHit::from_raw`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Plugin,
    Controller,
    Observer,
    Repository,
    Resolver,
    Model,
    Block,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::Plugin,
        Self::Controller,
        Self::Observer,
        Self::Repository,
        Self::Resolver,
        Self::Model,
        Self::Block,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Controller => "controller",
            Self::Observer => "observer",
            Self::Repository => "repository",
            Self::Resolver => "resolver",
            Self::Model => "model",
            Self::Block => "block",
        }
    }

    /// Directory marker used by the conventional source layout for this kind.
    #[must_use]
    pub const fn path_marker(self) -> &'static str {
        match self {
            Self::Plugin => "/Plugin/",
            Self::Controller => "/Controller/",
            Self::Observer => "/Observer/",
            Self::Repository => "Repository",
            Self::Resolver => "/Resolver/",
            Self::Model => "/Model/",
            Self::Block => "/Block/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    pub path: String,
    /// Similarity in `[0, 1]` for well-behaved engines (`1 - distance`).
    pub score: f32,
    #[serde(default)]
    pub is_plugin: bool,
    #[serde(default)]
    pub is_controller: bool,
    #[serde(default)]
    pub is_observer: bool,
    #[serde(default)]
    pub is_repository: bool,
    #[serde(default)]
    pub is_resolver: bool,
    #[serde(default)]
    pub is_model: bool,
    #[serde(default)]
    pub is_block: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchHit {
    /// A hit with only a path and score set.
    pub fn new(path: impl Into<String>, score: f32) -> Self {
        Self {
            path: path.into(),
            score,
            is_plugin: false,
            is_controller: false,
            is_observer: false,
            is_repository: false,
            is_resolver: false,
            is_model: false,
            is_block: false,
            class_name: None,
            method_name: None,
            methods: Vec::new(),
            module: None,
            file_type: None,
            area: None,
            snippet: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        *self.kind_flag_mut(kind) = true;
        self
    }

    #[must_use]
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }

    #[must_use]
    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    #[must_use]
    pub fn has_kind(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Plugin => self.is_plugin,
            EntityKind::Controller => self.is_controller,
            EntityKind::Observer => self.is_observer,
            EntityKind::Repository => self.is_repository,
            EntityKind::Resolver => self.is_resolver,
            EntityKind::Model => self.is_model,
            EntityKind::Block => self.is_block,
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        EntityKind::ALL.into_iter().filter(|kind| self.has_kind(*kind))
    }

    fn kind_flag_mut(&mut self, kind: EntityKind) -> &mut bool {
        match kind {
            EntityKind::Plugin => &mut self.is_plugin,
            EntityKind::Controller => &mut self.is_controller,
            EntityKind::Observer => &mut self.is_observer,
            EntityKind::Repository => &mut self.is_repository,
            EntityKind::Resolver => &mut self.is_resolver,
            EntityKind::Model => &mut self.is_model,
            EntityKind::Block => &mut self.is_block,
        }
    }

    /// File name component of `path`.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }

    /// Effective file type: explicit metadata first, then the path extension.
    #[must_use]
    pub fn effective_file_type(&self) -> Option<String> {
        if let Some(ft) = self.file_type.as_deref().map(str::trim) {
            if !ft.is_empty() {
                return Some(ft.to_ascii_lowercase());
            }
        }
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Normalize one raw engine hit. Returns `None` when the hit has no usable path.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let meta = obj.get("metadata").and_then(Value::as_object);
        let lookup = RawLookup { obj, meta };

        let path = lookup.string(&["path", "file", "file_path", "filePath"])?;
        let score = match lookup.number(&["distance"]) {
            Some(distance) => 1.0 - distance,
            None => lookup
                .number(&["score", "similarity"])
                .unwrap_or_default(),
        };

        let mut methods = lookup.string_list(&["methods"]);
        let method_name = lookup
            .string(&["methodName", "method_name", "method"])
            .or_else(|| methods.first().cloned());
        if methods.is_empty() {
            if let Some(method) = method_name.as_ref() {
                methods.push(method.clone());
            }
        }

        Some(Self {
            path,
            score: if score.is_finite() { score as f32 } else { 0.0 },
            is_plugin: lookup.flag(&["isPlugin", "is_plugin"]),
            is_controller: lookup.flag(&["isController", "is_controller"]),
            is_observer: lookup.flag(&["isObserver", "is_observer"]),
            is_repository: lookup.flag(&["isRepository", "is_repository"]),
            is_resolver: lookup.flag(&["isResolver", "is_resolver"]),
            is_model: lookup.flag(&["isModel", "is_model"]),
            is_block: lookup.flag(&["isBlock", "is_block"]),
            class_name: lookup.string(&["className", "class_name", "class"]),
            method_name,
            methods,
            module: lookup.string(&["module", "magentoModule"]),
            file_type: lookup.string(&["fileType", "file_type"]),
            area: lookup.string(&["area"]),
            snippet: lookup.string(&["snippet", "searchText", "content", "text"]),
        })
    }
}

struct RawLookup<'a> {
    obj: &'a Map<String, Value>,
    meta: Option<&'a Map<String, Value>>,
}

impl RawLookup<'_> {
    fn get(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| {
            self.obj
                .get(*key)
                .or_else(|| self.meta.and_then(|meta| meta.get(*key)))
                .filter(|value| !value.is_null())
        })
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        self.get(keys)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn number(&self, keys: &[&str]) -> Option<f64> {
        self.get(keys).and_then(Value::as_f64)
    }

    fn flag(&self, keys: &[&str]) -> bool {
        self.get(keys).and_then(Value::as_bool).unwrap_or(false)
    }

    fn string_list(&self, keys: &[&str]) -> Vec<String> {
        match self.get(keys) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Normalize an engine payload into hits.
///
/// Accepts a bare array or an object wrapping it under `results` / `hits`.
#[must_use]
pub fn normalize_hits(data: &Value) -> Vec<SearchHit> {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("results").or_else(|| obj.get("hits")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items.iter().filter_map(SearchHit::from_raw).collect()
}
