//! Environment-driven server configuration.

use scout_engine::EngineConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENGINE_BIN: &str = "scout-engine";
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;
const DATA_DIR: &str = ".scout";
const LOG_FILE_NAME: &str = "scout-mcp.log";

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("{key} must be a whole number of seconds, got '{value}'")]
    InvalidInterval { key: &'static str, value: String },

    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutEnv {
    pub engine_bin: PathBuf,
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub source_root: PathBuf,
    /// `None` disables file watching in the persistent engine.
    pub watch_interval: Option<Duration>,
    pub log_file: PathBuf,
    pub persistent: bool,
}

impl ScoutEnv {
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EnvError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let source_root = match var("SCOUT_ROOT") {
            Some(root) => PathBuf::from(root),
            None => env::current_dir()?,
        };
        let data_dir = source_root.join(DATA_DIR);
        let db_path = var("SCOUT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("index.db"));
        let model_path = var("SCOUT_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("models"));
        let log_file = var("SCOUT_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_log_file(&db_path));

        let watch_interval = match var("SCOUT_WATCH_INTERVAL") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| EnvError::InvalidInterval {
                    key: "SCOUT_WATCH_INTERVAL",
                    value: raw.clone(),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => Some(Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS)),
        };

        let persistent = !var("SCOUT_DISABLE_PERSISTENT").is_some_and(|v| is_truthy(&v));

        Ok(Self {
            engine_bin: var("SCOUT_ENGINE_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_BIN)),
            db_path,
            model_path,
            source_root,
            watch_interval,
            log_file,
            persistent,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.engine_bin, &self.db_path, &self.model_path)
            .with_source_root(&self.source_root)
            .with_watch_interval(self.watch_interval)
    }
}

fn default_log_file(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_hang_off_the_source_root() {
        let env = ScoutEnv::from_lookup(lookup(&[("SCOUT_ROOT", "/srv/shop")])).unwrap();
        assert_eq!(env.engine_bin, PathBuf::from("scout-engine"));
        assert_eq!(env.db_path, PathBuf::from("/srv/shop/.scout/index.db"));
        assert_eq!(env.model_path, PathBuf::from("/srv/shop/.scout/models"));
        assert_eq!(env.log_file, PathBuf::from("/srv/shop/.scout/scout-mcp.log"));
        assert_eq!(env.watch_interval, Some(Duration::from_secs(5)));
        assert!(env.persistent);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let env = ScoutEnv::from_lookup(lookup(&[
            ("SCOUT_ROOT", "/srv/shop"),
            ("SCOUT_DB_PATH", "   "),
            ("SCOUT_ENGINE_BIN", ""),
        ]))
        .unwrap();
        assert_eq!(env.db_path, PathBuf::from("/srv/shop/.scout/index.db"));
        assert_eq!(env.engine_bin, PathBuf::from("scout-engine"));
    }

    #[test]
    fn overrides_and_disable_switches() {
        let env = ScoutEnv::from_lookup(lookup(&[
            ("SCOUT_ROOT", "/srv/shop"),
            ("SCOUT_DB_PATH", "/var/lib/scout/idx.db"),
            ("SCOUT_WATCH_INTERVAL", "0"),
            ("SCOUT_DISABLE_PERSISTENT", "1"),
        ]))
        .unwrap();
        assert_eq!(env.log_file, PathBuf::from("/var/lib/scout/scout-mcp.log"));
        assert_eq!(env.watch_interval, None);
        assert!(!env.persistent);
        assert_eq!(env.engine_config().watch_interval, None);
    }

    #[test]
    fn rejects_garbage_interval() {
        let err = ScoutEnv::from_lookup(lookup(&[
            ("SCOUT_ROOT", "/srv/shop"),
            ("SCOUT_WATCH_INTERVAL", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SCOUT_WATCH_INTERVAL"));
    }
}
