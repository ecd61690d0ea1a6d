//! The sink: classification, scope, dedupe, and artefact-store fan-in.
//!
//! `workers` consumer tasks each own a dedicated bounded channel, and a
//! [`Dispatcher`] round-robins incoming lines across them. Each consumer
//! pulls one raw line, classifies it, runs every resulting emission through
//! scope and the per-keyspace dedupe registry, and records survivors into
//! the shared [`ArtefactStore`]. Tool adapters never touch the store or the
//! dispatcher directly; they write to the buffered per-tool channel handed
//! back by [`Sink::in_with_tool`], and a forwarder task tags and relays
//! their lines onto the dispatcher, so one slow tool can't
//! head-of-line-block the others.
//!
//! Each consumer owns a dedicated channel rather than sharing one receiver
//! behind a lock, so a `flush` barrier sent down a given consumer's channel
//! is only acknowledged once that consumer has drained and processed
//! everything queued ahead of it. A shared receiver can't make that
//! guarantee: whichever consumer happens to win the lock next could drain
//! every barrier while a sibling consumer is still mid-line on work queued
//! earlier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pr_core::{Artefact, ArtefactType, CancellationToken};
use pr_dedupe::Dedupe;
use pr_metrics::MetricsCollector;
use pr_scope::TargetScope;
use pr_store::ArtefactStore;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Per-tool and barrier traffic share one channel type so a `flush` can
/// interleave a synchronisation point with ordinary lines without a second
/// channel.
enum SinkMessage {
    Line(String),
    Barrier(oneshot::Sender<()>),
}

/// Round-robins lines across each consumer's dedicated channel so producers
/// don't need to know which worker will end up handling a given line.
struct Dispatcher {
    senders: Vec<mpsc::Sender<SinkMessage>>,
    next: AtomicUsize,
}

impl Dispatcher {
    fn new(senders: Vec<mpsc::Sender<SinkMessage>>) -> Self {
        Self { senders, next: AtomicUsize::new(0) }
    }

    async fn send(&self, message: SinkMessage) -> Result<(), mpsc::error::SendError<SinkMessage>> {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        self.senders[i].send(message).await
    }

    /// Sends one barrier down every consumer's own channel and returns the
    /// acks, in whatever order the sends happened to land.
    async fn barrier_acks(&self) -> Vec<oneshot::Receiver<()>> {
        let mut acks = Vec::with_capacity(self.senders.len());
        for sender in &self.senders {
            let (ack_tx, ack_rx) = oneshot::channel();
            if sender.send(SinkMessage::Barrier(ack_tx)).await.is_ok() {
                acks.push(ack_rx);
            }
        }
        acks
    }
}

/// Returned by [`Sink::in_with_tool`]. Drop (or explicitly await
/// [`ToolCleanup::finish()`]) once the adapter that owns the paired sender
/// has stopped sending, so the forwarder task can drain and exit instead of
/// leaking.
pub struct ToolCleanup {
    handle: JoinHandle<()>,
}

impl ToolCleanup {
    /// Wait for the per-tool forwarder to observe channel closure and
    /// finish relaying every buffered line onto the dispatcher.
    pub async fn finish(self) {
        let _ = self.handle.await;
    }
}

struct Shared {
    store: std::sync::Mutex<ArtefactStore>,
    dedupe: std::sync::Mutex<Dedupe>,
    scope: TargetScope,
    recorder: std::sync::Mutex<Option<Arc<MetricsCollector>>>,
}

/// Classification + scope + dedupe + store fan-in.
pub struct Sink {
    dispatcher: std::sync::OnceLock<Arc<Dispatcher>>,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    consumers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

/// Each consumer's dedicated channel is bounded so producers block (never
/// panic) on a stalled consumer; any finite positive capacity satisfies
/// that, this one is just generous enough to absorb bursts.
const MAIN_CHANNEL_CAPACITY: usize = 1024;

/// Per-tool input channels are buffered independently of the consumer channels.
const TOOL_CHANNEL_CAPACITY: usize = 512;

impl Sink {
    #[must_use]
    pub fn new(manifest_path: impl Into<std::path::PathBuf>, scope: TargetScope, dedupe: Dedupe) -> Self {
        Self {
            dispatcher: std::sync::OnceLock::new(),
            cancel: CancellationToken::new(),
            shared: Arc::new(Shared {
                    store: std::sync::Mutex::new(ArtefactStore::new(manifest_path)),
                    dedupe: std::sync::Mutex::new(dedupe),
                    scope,
                    recorder: std::sync::Mutex::new(None),
                }),
            consumers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Every classified `meta:` line after this call increments that
    /// stage's meta-line count, even for lines emitted after the stage's
    /// own `run` has returned.
    pub fn set_step_recorder(&self, recorder: Arc<MetricsCollector>) {
        *self.shared.recorder.lock().expect("recorder mutex poisoned") = Some(recorder);
    }

    /// Spawns `workers` consumer tasks, each owning a dedicated channel.
    /// Must be called at most once.
    pub fn start(&self, workers: usize) {
        let mut handles = self.consumers.lock().expect("consumers mutex poisoned");
        let mut senders = Vec::with_capacity(workers.max(1));
        for _ in 0..workers.max(1) {
            let (tx, rx) = mpsc::channel(MAIN_CHANNEL_CAPACITY);
            senders.push(tx);
            let shared = Arc::clone(&self.shared);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(consumer_loop(rx, shared, cancel)));
        }
        self.dispatcher
        .set(Arc::new(Dispatcher::new(senders)))
        .unwrap_or_else(|_| panic!("start called more than once"));
    }

    fn dispatcher(&self) -> &Arc<Dispatcher> {
        self.dispatcher.get().expect("start must be called before sending lines")
    }

    /// A raw, untagged producer handle into the dispatcher, used by the
    /// orchestrator to inject the target domain directly when running in
    /// domain-only scope mode.
    #[must_use]
    pub fn in_(&self) -> mpsc::Sender<String> {
        let (tx, mut rx) = mpsc::channel::<String>(TOOL_CHANNEL_CAPACITY);
        let dispatcher = Arc::clone(self.dispatcher());
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    line = rx.recv() => {
                        let Some(line) = line else { break };
                        if dispatcher.send(SinkMessage::Line(line)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        tx
    }

    /// `in_with_tool(tool) -> (send-channel, cleanup)`. The returned sender
    /// is what `pr-runner` streams a tool adapter's raw stdout/stderr lines
    /// into; the forwarder prefixes each with `tool(<name>): ` and relays it
    /// onto the dispatcher.
    #[must_use]
    pub fn in_with_tool(&self, tool: impl Into<String>) -> (mpsc::Sender<String>, ToolCleanup) {
        let tool = tool.into();
        let (tx, mut rx) = mpsc::channel::<String>(TOOL_CHANNEL_CAPACITY);
        let dispatcher = Arc::clone(self.dispatcher());
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    line = rx.recv() => {
                        let Some(line) = line else { break };
                        let tagged = format!("tool({tool}): {line}");
                        if dispatcher.send(SinkMessage::Line(tagged)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        (tx, ToolCleanup { handle })
    }

    /// Drains every line enqueued *before this call returns* to the store,
    /// then flushes the store to disk. Safe to call repeatedly and from the
    /// orchestrator's main task. Each consumer owns a dedicated channel, so
    /// sending one barrier down every consumer's own channel and waiting for
    /// all the acks guarantees every line queued ahead of it, on that
    /// channel, has been fully processed first.
    pub async fn flush(&self) -> pr_core::CoreResult<()> {
        let acks = self.dispatcher().barrier_acks().await;
        for ack in acks {
            let _ = ack.await;
        }
        let store = self.shared.store.lock().expect("store mutex poisoned");
        store.flush()
    }

    /// Stops consumers, flushes, and closes the sink. Idempotent: a second
    /// call finds every consumer channel already closed and is a no-op
    /// beyond another harmless store flush.
    pub async fn close(&self) -> pr_core::CoreResult<()> {
        self.flush().await?;
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut self.consumers.lock().expect("consumers mutex poisoned"));
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    #[must_use]
    pub fn artefact_count(&self) -> usize {
        self.shared.store.lock().expect("store mutex poisoned").len()
    }

    #[must_use]
    pub fn manifest_path(&self) -> std::path::PathBuf {
        self.shared.store.lock().expect("store mutex poisoned").manifest_path().to_path_buf()
    }
}

/// Drains its own channel to completion on every iteration, and only checks
/// cancellation between messages; a `flush` barrier sent before `cancel`
/// fires is therefore still guaranteed to see everything queued ahead of it.
async fn consumer_loop(mut rx: mpsc::Receiver<SinkMessage>, shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            message = rx.recv() => {
                match message {
                    None => break,
                    Some(SinkMessage::Barrier(ack)) => {
                        let _ = ack.send(());
                    }
                    Some(SinkMessage::Line(line)) => process_line(&shared, &line),
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}

fn process_line(shared: &Shared, line: &str) {
    let classified = pr_classify::classify(line);
    let tool = classified.tool.clone().unwrap_or_else(|| "unknown".to_string());

    for emission in classified.emissions {
        if emission.kind == ArtefactType::Meta {
            if let Some(recorder) = shared.recorder.lock().expect("recorder mutex poisoned").as_ref() {
                recorder.record_meta_line(&tool);
            }
        }

        if !in_scope(&shared.scope, emission.kind, &emission.value) {
            continue;
        }

        record_deduped(shared, &tool, emission.kind, &emission.value, emission.active, &emission.metadata);

        // A line tagged `active:` is always *also* recorded in the passive
        // category, so passive files remain a superset view while `.active`
        // holds only the probed-and-live subset.
        if emission.active {
            record_deduped(shared, &tool, emission.kind, &emission.value, false, &emission.metadata);
        }
    }
}

fn in_scope(scope: &TargetScope, kind: ArtefactType, value: &str) -> bool {
    match kind {
        ArtefactType::Domain | ArtefactType::Dns => scope.allows_domain(value),
        ArtefactType::Meta | ArtefactType::Certificate | ArtefactType::Rdap => true,
        _ => scope.allows_route(value),
    }
}

fn record_deduped(
    shared: &Shared,
    tool: &str,
    kind: ArtefactType,
    value: &str,
    active: bool,
    metadata: &std::collections::BTreeMap<String, serde_json::Value>,
) {
    let space = format!("{kind}:{}", if active { "active" } else { "passive" });
    let already_seen = shared.dedupe.lock().expect("dedupe mutex poisoned").seen_and_mark(&space, value);
    if already_seen {
        return;
    }
    let mut artefact = Artefact::new(kind, value, tool).active(active);
    for (k, v) in metadata {
        artefact = artefact.with_metadata(k.clone(), v.clone());
    }
    shared.store.lock().expect("store mutex poisoned").record(tool, artefact);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scoped_sink(target: &str) -> (tempfile::TempDir, Sink) {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("artifacts.jsonl");
        let sink = Sink::new(manifest, TargetScope::new(target), Dedupe::new());
        sink.start(2);
        (dir, sink)
    }

    #[tokio::test]
    async fn bare_domain_through_tool_channel_is_recorded() {
        let (_dir, sink) = scoped_sink("example.com");
        let (tx, cleanup) = sink.in_with_tool("subfinder");
        tx.send("a.example.com".to_string()).await.unwrap();
        drop(tx);
        cleanup.finish().await;
        sink.flush().await.unwrap();
        assert_eq!(sink.artefact_count(), 1);
    }

    #[tokio::test]
    async fn out_of_scope_domain_is_discarded() {
        let (_dir, sink) = scoped_sink("example.com");
        let (tx, cleanup) = sink.in_with_tool("subfinder");
        tx.send("evil.example.org".to_string()).await.unwrap();
        drop(tx);
        cleanup.finish().await;
        sink.flush().await.unwrap();
        assert_eq!(sink.artefact_count(), 0);
    }

    #[tokio::test]
    async fn active_route_is_also_recorded_passive() {
        let (_dir, sink) = scoped_sink("example.com");
        let (tx, cleanup) = sink.in_with_tool("httpx");
        tx.send("active:https://a.example.com/app.js [200] [Home] text/javascript".to_string())
        .await
        .unwrap();
        drop(tx);
        cleanup.finish().await;
        sink.flush().await.unwrap();

        let manifest = std::fs::read_to_string(sink.manifest_path()).unwrap();
        let js_records: Vec<_> = manifest
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .filter(|v| v["type"] == "js")
        .collect();
        // One active record plus its passive superset copy.
        assert_eq!(js_records.len(), 2, "manifest: {manifest}");
        assert!(js_records.iter().any(|r| r["active"] == serde_json::Value::Bool(true)));
        assert!(js_records.iter().any(|r| r["active"] == serde_json::Value::Bool(false)));
        assert!(js_records[0]["value"].as_str().unwrap().contains("a.example.com"));
    }

    #[tokio::test]
    async fn duplicate_lines_merge_instead_of_duplicating() {
        let (_dir, sink) = scoped_sink("example.com");
        let (tx, cleanup) = sink.in_with_tool("subfinder");
        tx.send("a.example.com".to_string()).await.unwrap();
        tx.send("a.example.com".to_string()).await.unwrap();
        drop(tx);
        cleanup.finish().await;
        sink.flush().await.unwrap();
        assert_eq!(sink.artefact_count(), 1);
    }

    #[tokio::test]
    async fn in_injects_untagged_lines() {
        let (_dir, sink) = scoped_sink("example.com");
        let tx = sink.in_();
        tx.send("example.com".to_string()).await.unwrap();
        drop(tx);
        sink.flush().await.unwrap();
        assert_eq!(sink.artefact_count(), 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_dir, sink) = scoped_sink("example.com");
        let (tx, cleanup) = sink.in_with_tool("subfinder");
        tx.send("a.example.com".to_string()).await.unwrap();
        drop(tx);
        cleanup.finish().await;
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(sink.artefact_count(), 1);
    }

    #[tokio::test]
    async fn meta_lines_are_recorded_against_the_collector() {
        let (_dir, sink) = scoped_sink("example.com");
        let recorder = Arc::new(MetricsCollector::new());
        sink.set_step_recorder(Arc::clone(&recorder));
        let (tx, cleanup) = sink.in_with_tool("rdap");
        tx.send("meta: lookup skipped".to_string()).await.unwrap();
        drop(tx);
        cleanup.finish().await;
        sink.flush().await.unwrap();
        let report = recorder.report();
        let rdap = report.stages.iter().find(|s| s.name == "rdap").unwrap();
        assert_eq!(rdap.meta_lines, 1);
    }

    #[tokio::test]
    async fn flush_is_safe_to_call_repeatedly() {
        let (_dir, sink) = scoped_sink("example.com");
        sink.flush().await.unwrap();
        sink.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        sink.flush().await.unwrap();
    }

    #[tokio::test]
    async fn flush_waits_for_every_worker_with_many_lines_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("artifacts.jsonl");
        let sink = Sink::new(manifest, TargetScope::new("example.com"), Dedupe::new());
        sink.start(4);
        let (tx, cleanup) = sink.in_with_tool("subfinder");
        for i in 0..200 {
            tx.send(format!("host-{i}.example.com")).await.unwrap();
        }
        drop(tx);
        cleanup.finish().await;
        sink.flush().await.unwrap();
        assert_eq!(sink.artefact_count(), 200);
    }
}
