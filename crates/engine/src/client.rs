use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::output::{parse_engine_output, strip_diagnostics};
use serde_json::{json, Value};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;

const STDERR_TAIL_CHARS: usize = 600;

/// One-shot engine invocations: spawn, wait for exit, parse stdout.
#[derive(Debug, Clone)]
pub struct EngineClient {
    config: Arc<EngineConfig>,
}

impl EngineClient {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        let stdout = self
            .run(
                "search",
                self.config.search_args(query, limit),
                self.config.oneshot_timeout,
            )
            .await?;
        parse_engine_output(&stdout)
    }

    /// Index output is informational; a missing JSON summary is not an error.
    pub async fn index(&self, root: &Path) -> Result<Value> {
        let stdout = self
            .run(
                "index",
                self.config.index_args(root),
                self.config.index_timeout,
            )
            .await?;
        match parse_engine_output(&stdout) {
            Ok(value) => Ok(value),
            Err(EngineError::UnparsableOutput(_)) => {
                let summary = strip_diagnostics(&stdout);
                Ok(json!({ "output": tail_chars(&summary, STDERR_TAIL_CHARS) }))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn stats(&self) -> Result<Value> {
        let stdout = self
            .run(
                "stats",
                self.config.stats_args(),
                self.config.oneshot_timeout,
            )
            .await?;
        parse_engine_output(&stdout)
    }

    async fn run(&self, command: &str, args: Vec<OsString>, timeout: Duration) -> Result<String> {
        let started = Instant::now();
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| EngineError::Spawn {
            binary: self.config.binary_display(),
            source,
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(EngineError::Timeout {
                    command: command.to_string(),
                    after: timeout,
                })
            }
        };

        log::debug!(
            "engine {command} exited with {} in {} ms",
            output.status,
            started.elapsed().as_millis()
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::CommandFailed {
                status: output.status.to_string(),
                stderr: tail_chars(stderr.trim(), STDERR_TAIL_CHARS),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}
