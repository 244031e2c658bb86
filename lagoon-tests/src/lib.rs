/// Test utilities and fixtures for the LagoonDB client workspace.
///
/// Provides a scripted engine that replays pre-programmed signal sequences
/// (optionally with inter-item delays to simulate streaming arrival), shared
/// row fixtures, and the legacy single-shot waitable used as a behavioral
/// cross-check against the current delivery primitive.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::watch;

use lagoon_client::{
    DocumentEngine, GetReplicaResult, QueryMetaData, QueryRequest, QueryStatus, QueryWarning,
    ReplicaReadRequest, ScanRequest, ScanResult,
};
use lagoon_core::{CancellationCell, Error, ProducerError, Result, ResultState, SignalSink};

/// Initialize tracing output for a test binary; safe to call repeatedly
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Ten inventory documents, the row shape the integration suites work with
pub fn sample_rows() -> Vec<Value> {
    vec![
        json!({"id": "dev-0001", "kind": "sensor", "site": "dock-a", "reading": 41.5}),
        json!({"id": "dev-0002", "kind": "sensor", "site": "dock-a", "reading": 39.2}),
        json!({"id": "dev-0003", "kind": "gateway", "site": "dock-b", "reading": null}),
        json!({"id": "dev-0004", "kind": "sensor", "site": "dock-b", "reading": 44.0}),
        json!({"id": "dev-0005", "kind": "camera", "site": "pier-1", "reading": null}),
        json!({"id": "dev-0006", "kind": "sensor", "site": "pier-1", "reading": 37.8}),
        json!({"id": "dev-0007", "kind": "sensor", "site": "pier-2", "reading": 40.1}),
        json!({"id": "dev-0008", "kind": "gateway", "site": "pier-2", "reading": null}),
        json!({"id": "dev-0009", "kind": "sensor", "site": "dock-a", "reading": 42.6}),
        json!({"id": "dev-0010", "kind": "camera", "site": "dock-b", "reading": null}),
    ]
}

/// Query meta-data matching a successful run over [`sample_rows`]
pub fn sample_meta() -> QueryMetaData {
    QueryMetaData {
        request_id: "c675ce2a-31b7-4531-bb69-574f66ce464f".into(),
        client_context_id: "125a63-df8e-3f47-7d10".into(),
        status: QueryStatus::Success,
        signature: Some(json!({"*": "*"})),
        warnings: vec![QueryWarning {
            code: 212,
            message: "index scanned more keys than returned".into(),
        }],
        metrics: None,
        profile: None,
    }
}

/// A replica read fixture
pub fn sample_replica(content: &str, is_replica: bool) -> GetReplicaResult {
    GetReplicaResult {
        content: Bytes::copy_from_slice(content.as_bytes()),
        cas: 0x51ab,
        is_replica,
    }
}

/// Scan hit fixtures for ids `doc-1` through `doc-{count}`
pub fn sample_scan_hits(count: usize) -> Vec<ScanResult> {
    (1..=count)
        .map(|i| ScanResult {
            id: format!("doc-{}", i),
            content: Some(Bytes::from_static(b"{}")),
            cas: Some(i as u64),
            expiry_time: None,
        })
        .collect()
}

/// Script for one engine operation: the signals to emit and their pacing.
///
/// A configured failure preempts the items: the engine reports the error
/// and ends the stream without producing anything, matching how the engine
/// surfaces a failed dispatch.
#[derive(Debug, Clone)]
pub struct OperationScript<I, M> {
    pub items: Vec<I>,
    pub metadata: Option<M>,
    pub failure: Option<ProducerError>,
    /// Sleep between emissions, simulating streaming arrival
    pub item_delay: Option<Duration>,
    /// Sleep before the first emission, simulating dispatch latency
    pub startup_delay: Option<Duration>,
}

impl<I, M> Default for OperationScript<I, M> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            metadata: None,
            failure: None,
            item_delay: None,
            startup_delay: None,
        }
    }
}

impl<I, M> OperationScript<I, M> {
    pub fn new(items: Vec<I>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: M) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_failure(mut self, failure: ProducerError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = Some(delay);
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = Some(delay);
        self
    }
}

async fn run_script<I, M>(
    sink: SignalSink<I, M>,
    script: OperationScript<I, M>,
    cancel: Option<Arc<CancellationCell>>,
) where
    I: Send + 'static,
    M: Send + 'static,
{
    if let Some(delay) = script.startup_delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(failure) = script.failure {
        let _ = sink.error(failure);
        let _ = sink.end();
        return;
    }
    for item in script.items {
        if let Some(cell) = &cancel {
            if cell.should_stop() {
                break;
            }
        }
        if let Some(delay) = script.item_delay {
            tokio::time::sleep(delay).await;
        }
        let _ = sink.item(item);
    }
    if let Some(metadata) = script.metadata {
        let _ = sink.metadata(metadata);
    }
    let _ = sink.end();
}

/// `DocumentEngine` implementation driven by pre-programmed scripts.
///
/// Each start method consumes its script (an unscripted operation just
/// ends immediately), spawns a task that replays the scripted signals, and
/// counts the invocation so tests can assert the engine was hit exactly
/// once.
#[derive(Default)]
pub struct ScriptedEngine {
    query: Mutex<Option<OperationScript<Value, QueryMetaData>>>,
    all_replicas: Mutex<Option<OperationScript<GetReplicaResult, ()>>>,
    any_replica: Mutex<Option<OperationScript<GetReplicaResult, ()>>>,
    scan: Mutex<Option<OperationScript<ScanResult, ()>>>,
    started: AtomicUsize,
    last_query: Mutex<Option<QueryRequest>>,
    last_scan: Mutex<Option<ScanRequest>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_script(self, script: OperationScript<Value, QueryMetaData>) -> Self {
        *self.query.lock() = Some(script);
        self
    }

    pub fn with_all_replicas_script(self, script: OperationScript<GetReplicaResult, ()>) -> Self {
        *self.all_replicas.lock() = Some(script);
        self
    }

    pub fn with_any_replica_script(self, script: OperationScript<GetReplicaResult, ()>) -> Self {
        *self.any_replica.lock() = Some(script);
        self
    }

    pub fn with_scan_script(self, script: OperationScript<ScanResult, ()>) -> Self {
        *self.scan.lock() = Some(script);
        self
    }

    /// Number of operations started across all kinds
    pub fn operations_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// The most recent query request, for request pass-through assertions
    pub fn last_query(&self) -> Option<QueryRequest> {
        self.last_query.lock().clone()
    }

    /// The most recent scan request
    pub fn last_scan(&self) -> Option<ScanRequest> {
        self.last_scan.lock().clone()
    }
}

impl DocumentEngine for ScriptedEngine {
    fn start_query(&self, request: QueryRequest, sink: SignalSink<Value, QueryMetaData>) {
        self.started.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock() = Some(request);
        let script = self.query.lock().take().unwrap_or_default();
        tokio::spawn(run_script(sink, script, None));
    }

    fn start_get_all_replicas(
        &self,
        _request: ReplicaReadRequest,
        sink: SignalSink<GetReplicaResult, ()>,
    ) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let script = self.all_replicas.lock().take().unwrap_or_default();
        tokio::spawn(run_script(sink, script, None));
    }

    fn start_get_any_replica(
        &self,
        _request: ReplicaReadRequest,
        sink: SignalSink<GetReplicaResult, ()>,
    ) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let script = self.any_replica.lock().take().unwrap_or_default();
        tokio::spawn(run_script(sink, script, None));
    }

    fn start_scan(
        &self,
        request: ScanRequest,
        sink: SignalSink<ScanResult, ()>,
        cancel: Arc<CancellationCell>,
    ) {
        self.started.fetch_add(1, Ordering::SeqCst);
        *self.last_scan.lock() = Some(request);
        let script = self.scan.lock().take().unwrap_or_default();
        tokio::spawn(run_script(sink, script, Some(cancel)));
    }
}

/// Earlier-generation deferred value, kept as a behavioral cross-check.
///
/// It supports only success/error terminal events, with no intermediate
/// items. The observable contract matches the current primitive: a single
/// resolution, and a structured duplicate-terminal error rather than a
/// panic when a second terminal event arrives.
pub struct SingleShotWaitable<T> {
    state: Mutex<ResultState<T>>,
    done: watch::Sender<bool>,
}

impl<T> SingleShotWaitable<T> {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            state: Mutex::new(ResultState::Pending),
            done,
        }
    }

    /// Resolve with a value. Returns the duplicate-terminal violation if a
    /// terminal event was already delivered.
    pub fn succeed(&self, value: T) -> Result<()> {
        let settled = self.state.lock().settle(Ok(value));
        if !settled {
            return Err(Error::DuplicateTerminal);
        }
        let _ = self.done.send(true);
        Ok(())
    }

    /// Reject with an engine failure. Returns the duplicate-terminal
    /// violation if a terminal event was already delivered.
    pub fn fail(&self, error: ProducerError) -> Result<()> {
        let settled = self.state.lock().settle(Err(Error::Producer(error)));
        if !settled {
            return Err(Error::DuplicateTerminal);
        }
        let _ = self.done.send(true);
        Ok(())
    }

    /// Suspend until the terminal event. Callable repeatedly and
    /// concurrently; every caller observes the identical outcome.
    pub async fn wait(&self) -> Result<T>
    where
        T: Clone,
    {
        let mut done = self.done.subscribe();
        loop {
            {
                match &*self.state.lock() {
                    ResultState::Fulfilled(value) => return Ok(value.clone()),
                    ResultState::Rejected(err) => return Err(err.clone()),
                    ResultState::Pending => {}
                }
            }
            let _ = done.changed().await;
        }
    }
}

impl<T> Default for SingleShotWaitable<T> {
    fn default() -> Self {
        Self::new()
    }
}
