//! Persistent engine subprocess.
//!
//! One long-lived `serve` process answers line-delimited JSON requests over its stdin/stdout.
//! Concurrent callers share the pipe: writes are serialized, and every response is handed to
//! the oldest pending call. The engine has no way to tag responses reliably, so queue order
//! must equal wire order; both are established under the writer lock.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::framing::{EngineFrame, EngineFrames};
use scout_protocol::{EngineRequest, EngineResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Attached, waiting for the `{"ready": true}` line.
    Starting,
    Ready,
    Down,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct PendingCall {
    id: u64,
    command: String,
    deadline: Instant,
    resolver: oneshot::Sender<Result<Value>>,
}

struct Channel {
    generation: AtomicU64,
    next_id: AtomicU64,
    pending: Mutex<VecDeque<PendingCall>>,
    writer: AsyncMutex<Option<BoxedWriter>>,
    readiness: watch::Sender<Readiness>,
}

impl Channel {
    fn new() -> Self {
        let (readiness, _) = watch::channel(Readiness::Down);
        Self {
            generation: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            pending: Mutex::new(VecDeque::new()),
            writer: AsyncMutex::new(None),
            readiness,
        }
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<PendingCall>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn resolve_oldest(&self, response: EngineResponse) {
        let next = self.pending().pop_front();
        let Some(call) = next else {
            log::warn!("dropping unsolicited engine response (no call pending)");
            return;
        };

        if let Some(reported) = &response.id {
            if response.numeric_id() != Some(call.id) {
                log::warn!(
                    "engine answered id {reported} but the oldest pending call is #{} ({}); \
                     delivering in send order",
                    call.id,
                    call.command
                );
            }
        }
        if Instant::now() > call.deadline {
            log::debug!("late engine response for call #{} ({})", call.id, call.command);
        }

        let result = response.into_result().map_err(EngineError::Engine);
        if call.resolver.send(result).is_err() {
            log::debug!("engine call #{} was abandoned before its response", call.id);
        }
    }

    fn remove_pending(&self, id: u64) -> bool {
        let mut pending = self.pending();
        match pending.iter().position(|call| call.id == id) {
            Some(pos) => {
                pending.remove(pos);
                true
            }
            None => false,
        }
    }

    fn fail_all_pending(&self) -> usize {
        let drained: Vec<PendingCall> = self.pending().drain(..).collect();
        let count = drained.len();
        for call in drained {
            let _ = call.resolver.send(Err(EngineError::Exited));
        }
        count
    }

    async fn disconnect(&self, generation: u64, reason: &str) {
        let mut writer = self.writer.lock().await;
        if !self.is_current(generation) {
            return;
        }
        let already_down = writer.is_none() && *self.readiness.borrow() == Readiness::Down;
        writer.take();
        self.readiness.send_replace(Readiness::Down);
        let failed = self.fail_all_pending();
        if !already_down || failed > 0 {
            log::warn!("engine channel closed ({reason}); failed {failed} pending call(s)");
        }
    }
}

struct ProcessHandle {
    generation: u64,
    pid: Option<u32>,
    kill: oneshot::Sender<()>,
}

/// Owns the persistent `serve` subprocess and multiplexes calls over it.
pub struct EngineSupervisor {
    config: Arc<EngineConfig>,
    channel: Arc<Channel>,
    process: Mutex<Option<ProcessHandle>>,
}

impl EngineSupervisor {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            channel: Arc::new(Channel::new()),
            process: Mutex::new(None),
        }
    }

    pub fn readiness(&self) -> Readiness {
        *self.channel.readiness.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn pending_calls(&self) -> usize {
        self.channel.pending().len()
    }

    pub fn pid(&self) -> Option<u32> {
        self.process_slot().as_ref().and_then(|handle| handle.pid)
    }

    fn process_slot(&self) -> MutexGuard<'_, Option<ProcessHandle>> {
        self.process.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the engine in serve mode and wait for its ready line.
    ///
    /// Returns `false` when the process cannot be spawned or does not report readiness within
    /// the configured startup timeout; callers then use the one-shot client.
    pub async fn start(&self) -> bool {
        if self.is_ready() {
            return true;
        }
        self.stop().await;

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(self.config.serve_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                log::error!(
                    "failed to spawn engine '{}' in serve mode: {err}",
                    self.config.binary_display()
                );
                self.channel.readiness.send_replace(Readiness::Down);
                return false;
            }
        };

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            log::error!("engine serve process has no stdio pipes");
            let _ = child.start_kill();
            self.channel.readiness.send_replace(Readiness::Down);
            return false;
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let pid = child.id();
        let generation = self.attach(stdin, BufReader::new(stdout)).await;
        let (kill, kill_rx) = oneshot::channel::<()>();
        *self.process_slot() = Some(ProcessHandle {
            generation,
            pid,
            kill,
        });

        let channel = Arc::clone(&self.channel);
        tokio::spawn(async move {
            let reason = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => format!("engine exited with {status}"),
                    Err(err) => format!("waiting on engine failed: {err}"),
                },
                _ = kill_rx => {
                    let _ = child.kill().await;
                    "engine stopped".to_string()
                }
            };
            channel.disconnect(generation, &reason).await;
        });

        let ready = self.wait_ready(self.config.ready_timeout).await;
        if ready {
            log::info!("engine serve process ready (pid {pid:?})");
        } else {
            log::warn!(
                "engine serve process not ready after {:?}; one-shot fallback stays in use",
                self.config.ready_timeout
            );
        }
        ready
    }

    /// Run the channel protocol over arbitrary streams.
    ///
    /// Any calls still pending from a previous attachment fail. Returns the channel
    /// generation, which identifies this attachment in later exit notifications.
    pub async fn attach<W, R>(&self, writer: W, reader: R) -> u64
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let generation = {
            let mut slot = self.channel.writer.lock().await;
            let generation = self.channel.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *slot = Some(Box::new(writer));
            self.channel.fail_all_pending();
            self.channel.readiness.send_replace(Readiness::Starting);
            generation
        };

        let channel = Arc::clone(&self.channel);
        tokio::spawn(read_loop(channel, generation, EngineFrames::new(reader)));
        generation
    }

    /// Wait until the channel leaves `Starting`. `true` only if it became ready in time.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.channel.readiness.subscribe();
        let waited = tokio::time::timeout(
            timeout,
            rx.wait_for(|state| *state != Readiness::Starting),
        )
        .await;
        match waited {
            Ok(Ok(state)) => *state == Readiness::Ready,
            _ => false,
        }
    }

    /// Send one request and wait for its (FIFO-correlated) response.
    pub async fn call(&self, command: &str, params: Value, timeout: Duration) -> Result<Value> {
        if !self.is_ready() {
            return Err(EngineError::NotRunning);
        }

        let id = self.channel.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let line = EngineRequest::new(id, command, params).to_line()?;
        let (resolver, response) = oneshot::channel();

        {
            let mut writer = self.channel.writer.lock().await;
            let Some(stream) = writer.as_mut() else {
                return Err(EngineError::NotRunning);
            };
            self.channel.pending().push_back(PendingCall {
                id,
                command: command.to_string(),
                deadline: Instant::now() + timeout,
                resolver,
            });
            let mut written = stream.write_all(line.as_bytes()).await;
            if written.is_ok() {
                written = stream.flush().await;
            }
            if let Err(err) = written {
                self.channel.remove_pending(id);
                return Err(EngineError::Io(err));
            }
        }
        log::trace!("engine call #{id} ({command}) sent");

        match tokio::time::timeout(timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(EngineError::Exited),
            Err(_) => {
                self.channel.remove_pending(id);
                Err(EngineError::Timeout {
                    command: command.to_string(),
                    after: timeout,
                })
            }
        }
    }

    /// [`call`](Self::call) with the configured default timeout.
    pub async fn call_default(&self, command: &str, params: Value) -> Result<Value> {
        self.call(command, params, self.config.call_timeout).await
    }

    /// Kill the current process (if any) and fail everything pending.
    pub async fn stop(&self) {
        let handle = self.process_slot().take();
        let generation = match handle {
            Some(handle) => {
                let _ = handle.kill.send(());
                handle.generation
            }
            None => self.channel.generation.load(Ordering::SeqCst),
        };
        self.channel.disconnect(generation, "stopped").await;
    }
}

async fn read_loop<R>(channel: Arc<Channel>, generation: u64, mut frames: EngineFrames<R>)
where
    R: AsyncBufRead + Unpin,
{
    let reason = loop {
        match frames.next_frame().await {
            Ok(Some(EngineFrame::Ready)) => {
                if channel.is_current(generation) {
                    channel.readiness.send_replace(Readiness::Ready);
                }
            }
            Ok(Some(EngineFrame::Response(response))) => {
                if channel.is_current(generation) {
                    channel.resolve_oldest(response);
                }
            }
            Ok(Some(EngineFrame::Malformed(line))) => {
                log::debug!("skipping non-protocol engine line: {line}");
            }
            Ok(None) => break "engine closed its output".to_string(),
            Err(err) => break format!("reading engine output failed: {err}"),
        }
    };
    channel.disconnect(generation, &reason).await;
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if !line.is_empty() {
            log::debug!(target: "scout::engine", "{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{DuplexStream, Lines, ReadHalf, WriteHalf};

    struct StubEngine {
        requests: Lines<BufReader<ReadHalf<DuplexStream>>>,
        out: WriteHalf<DuplexStream>,
    }

    impl StubEngine {
        async fn send(&mut self, value: Value) {
            let mut line = value.to_string();
            line.push('\n');
            self.out.write_all(line.as_bytes()).await.unwrap();
        }

        async fn send_raw(&mut self, line: &str) {
            self.out.write_all(line.as_bytes()).await.unwrap();
        }

        async fn next_request(&mut self) -> Value {
            let line = self.requests.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn echo(&mut self, request: &Value) {
            self.send(json!({"id": request["id"], "ok": true, "data": request["query"]})).await;
        }
    }

    async fn attach_stub(supervisor: &EngineSupervisor) -> StubEngine {
        let (ours, theirs) = tokio::io::duplex(64 * 1024);
        let (read, write) = tokio::io::split(ours);
        supervisor.attach(write, BufReader::new(read)).await;
        let (their_read, their_write) = tokio::io::split(theirs);
        StubEngine {
            requests: BufReader::new(their_read).lines(),
            out: their_write,
        }
    }

    fn supervisor() -> EngineSupervisor {
        EngineSupervisor::new(Arc::new(EngineConfig::new("unused", "db", "models")))
    }

    async fn ready_stub(supervisor: &EngineSupervisor) -> StubEngine {
        let mut stub = attach_stub(supervisor).await;
        stub.send(json!({"ready": true})).await;
        assert!(supervisor.wait_ready(Duration::from_secs(2)).await);
        stub
    }

    #[tokio::test]
    async fn concurrent_calls_receive_responses_in_send_order() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;
        let timeout = Duration::from_secs(5);

        let engine = async move {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(stub.next_request().await);
            }
            for request in &seen {
                stub.echo(request).await;
            }
            seen
        };

        let (a, b, c, seen) = tokio::join!(
            sup.call("search", json!({"query": "alpha"}), timeout),
            sup.call("search", json!({"query": "beta"}), timeout),
            sup.call("search", json!({"query": "gamma"}), timeout),
            engine,
        );

        assert_eq!(a.unwrap(), json!("alpha"));
        assert_eq!(b.unwrap(), json!("beta"));
        assert_eq!(c.unwrap(), json!("gamma"));
        let ids: Vec<u64> = seen.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not increasing: {ids:?}");
        assert_eq!(sup.pending_calls(), 0);
    }

    #[tokio::test]
    async fn mismatched_ids_are_still_matched_by_order() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let engine = async move {
            let first = stub.next_request().await;
            stub.send(json!({"id": 999, "ok": true, "data": first["query"]})).await;
            stub
        };
        let (result, _stub) = tokio::join!(
            sup.call("search", json!({"query": "only"}), Duration::from_secs(5)),
            engine
        );
        assert_eq!(result.unwrap(), json!("only"));
    }

    #[tokio::test]
    async fn non_numeric_ids_are_still_delivered() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;
        let timeout = Duration::from_secs(5);

        let engine = async move {
            let first = stub.next_request().await;
            let second = stub.next_request().await;
            stub.send(json!({"id": "first", "ok": true, "data": first["query"]})).await;
            stub.send(json!({"id": -2.5, "data": second["query"]})).await;
            stub
        };
        let (a, b, _stub) = tokio::join!(
            sup.call("search", json!({"query": "one"}), timeout),
            sup.call("search", json!({"query": "two"}), timeout),
            engine
        );
        assert_eq!(a.unwrap(), json!("one"));
        assert_eq!(b.unwrap(), json!("two"));
        assert_eq!(sup.pending_calls(), 0);
    }

    #[tokio::test]
    async fn overlapping_deadlines_keep_their_own_responses() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let engine = async move {
            let first = stub.next_request().await;
            let second = stub.next_request().await;
            stub.echo(&first).await;
            stub.echo(&second).await;
            stub
        };
        let (short, long, _stub) = tokio::join!(
            sup.call("search", json!({"query": "short"}), Duration::from_secs(2)),
            sup.call("search", json!({"query": "long"}), Duration::from_secs(10)),
            engine
        );
        assert_eq!(short.unwrap(), json!("short"));
        assert_eq!(long.unwrap(), json!("long"));
        assert_eq!(sup.pending_calls(), 0);
    }

    #[tokio::test]
    async fn response_after_timeout_goes_to_next_waiter() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let expired = sup
            .call("search", json!({"query": "expired"}), Duration::from_millis(50))
            .await;
        assert!(matches!(expired, Err(EngineError::Timeout { .. })));
        let late = stub.next_request().await;

        let engine = async {
            let next = stub.next_request().await;
            stub.echo(&late).await;
            stub.echo(&next).await;
        };
        let (waiting, ()) = tokio::join!(
            sup.call("search", json!({"query": "waiting"}), Duration::from_secs(5)),
            engine
        );
        // The answer for the timed-out call is delivered to the oldest waiter.
        assert_eq!(waiting.unwrap(), json!("expired"));
        assert_eq!(sup.pending_calls(), 0);
    }

    #[tokio::test]
    async fn timeout_fails_only_that_call() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let slow = sup
            .call("search", json!({"query": "slow"}), Duration::from_millis(50))
            .await;
        assert!(matches!(slow, Err(EngineError::Timeout { .. })));
        assert_eq!(sup.pending_calls(), 0);
        assert_eq!(stub.next_request().await["query"], json!("slow"));

        let engine = async {
            let request = stub.next_request().await;
            stub.echo(&request).await;
        };
        let (fast, ()) = tokio::join!(
            sup.call("search", json!({"query": "fast"}), Duration::from_secs(5)),
            engine
        );
        assert_eq!(fast.unwrap(), json!("fast"));
        assert!(sup.is_ready());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let engine = async {
            let request = stub.next_request().await;
            stub.send_raw("warming caches...\n").await;
            stub.send_raw("{not json\n").await;
            stub.echo(&request).await;
        };
        let (result, ()) = tokio::join!(
            sup.call("search", json!({"query": "q"}), Duration::from_secs(5)),
            engine
        );
        assert_eq!(result.unwrap(), json!("q"));
    }

    #[tokio::test]
    async fn engine_error_response_fails_the_call() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let engine = async {
            stub.next_request().await;
            stub.send(json!({"ok": false, "error": "bad query"})).await;
        };
        let (result, ()) = tokio::join!(
            sup.call("search", json!({"query": "q"}), Duration::from_secs(5)),
            engine
        );
        match result {
            Err(EngineError::Engine(message)) => assert_eq!(message, "bad query"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn engine_exit_fails_pending_and_resets_readiness() {
        let sup = supervisor();
        let mut stub = ready_stub(&sup).await;

        let engine = async move {
            stub.next_request().await;
            drop(stub);
        };
        let (result, ()) = tokio::join!(
            sup.call("search", json!({"query": "q"}), Duration::from_secs(5)),
            engine
        );
        assert!(matches!(result, Err(EngineError::Exited)));
        assert!(!sup.wait_ready(Duration::from_millis(200)).await);
        assert_eq!(sup.readiness(), Readiness::Down);
        assert!(matches!(
            sup.call("search", json!({}), Duration::from_secs(1)).await,
            Err(EngineError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn no_ready_line_means_not_ready() {
        let sup = supervisor();
        let _stub = attach_stub(&sup).await;
        assert!(!sup.wait_ready(Duration::from_millis(50)).await);
        assert_eq!(sup.readiness(), Readiness::Starting);
        assert!(matches!(
            sup.call("search", json!({}), Duration::from_secs(1)).await,
            Err(EngineError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn reattach_after_stop_is_usable() {
        let sup = supervisor();
        let _old = ready_stub(&sup).await;
        sup.stop().await;
        assert_eq!(sup.readiness(), Readiness::Down);

        let mut stub = ready_stub(&sup).await;
        let engine = async {
            let request = stub.next_request().await;
            stub.echo(&request).await;
        };
        let (result, ()) = tokio::join!(
            sup.call("search", json!({"query": "again"}), Duration::from_secs(5)),
            engine
        );
        assert_eq!(result.unwrap(), json!("again"));
    }
}
