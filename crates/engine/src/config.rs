use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ONESHOT_TIMEOUT: Duration = Duration::from_secs(60);
// Full re-embedding of a large source tree is slow; keep the bound generous.
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How to reach the engine binary and which index it works on.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub binary: PathBuf,
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    /// Source root; enables file watching in serve mode when set together with
    /// `watch_interval`.
    pub source_root: Option<PathBuf>,
    pub watch_interval: Option<Duration>,
    pub ready_timeout: Duration,
    pub call_timeout: Duration,
    pub oneshot_timeout: Duration,
    pub index_timeout: Duration,
}

impl EngineConfig {
    pub fn new(
        binary: impl Into<PathBuf>,
        db_path: impl Into<PathBuf>,
        model_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            db_path: db_path.into(),
            model_path: model_path.into(),
            source_root: None,
            watch_interval: None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            oneshot_timeout: DEFAULT_ONESHOT_TIMEOUT,
            index_timeout: DEFAULT_INDEX_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_watch_interval(mut self, interval: Option<Duration>) -> Self {
        self.watch_interval = interval.filter(|d| !d.is_zero());
        self
    }

    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn binary_display(&self) -> String {
        self.binary.display().to_string()
    }

    pub(crate) fn serve_args(&self) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("serve"),
            OsString::from("-d"),
            self.db_path.clone().into_os_string(),
            OsString::from("-c"),
            self.model_path.clone().into_os_string(),
        ];
        if let Some(root) = self.source_root.as_ref() {
            args.push(OsString::from("-m"));
            args.push(root.clone().into_os_string());
            if let Some(interval) = self.watch_interval {
                args.push(OsString::from("--watch"));
                args.push(OsString::from("--watch-interval"));
                args.push(OsString::from(interval.as_secs().max(1).to_string()));
            }
        }
        args
    }

    pub(crate) fn search_args(&self, query: &str, limit: usize) -> Vec<OsString> {
        vec![
            OsString::from("search"),
            OsString::from(query),
            OsString::from("-d"),
            self.db_path.clone().into_os_string(),
            OsString::from("-c"),
            self.model_path.clone().into_os_string(),
            OsString::from("-l"),
            OsString::from(limit.to_string()),
            OsString::from("-f"),
            OsString::from("json"),
        ]
    }

    pub(crate) fn index_args(&self, root: &Path) -> Vec<OsString> {
        vec![
            OsString::from("index"),
            OsString::from("-m"),
            root.as_os_str().to_os_string(),
            OsString::from("-d"),
            self.db_path.clone().into_os_string(),
            OsString::from("-c"),
            self.model_path.clone().into_os_string(),
        ]
    }

    pub(crate) fn stats_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("stats"),
            OsString::from("-d"),
            self.db_path.clone().into_os_string(),
        ]
    }
}
