/// End-to-end tests for the client surface over a scripted engine
///
/// Covers both consumption styles for queries, replica reads and scans,
/// request pass-through, and single engine invocation under concurrent
/// awaits.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use lagoon_client::{
    Client, Error, ProducerError, QueryMetaData, QueryStatus, ScanRequest,
};
use lagoon_test_utils::{
    init_test_logging, sample_meta, sample_replica, sample_rows, OperationScript, ScriptedEngine,
};

fn streaming_delays() -> Vec<Option<Duration>> {
    // Mirror both arrival shapes: everything at once, and row-by-row
    vec![None, Some(Duration::from_millis(3))]
}

fn query_engine(delay: Option<Duration>) -> Arc<ScriptedEngine> {
    let mut script = OperationScript::new(sample_rows()).with_metadata(sample_meta());
    if let Some(delay) = delay {
        script = script.with_item_delay(delay);
    }
    Arc::new(ScriptedEngine::new().with_query_script(script))
}

#[tokio::test]
async fn test_query_resolves_rows_and_meta() -> anyhow::Result<()> {
    init_test_logging();
    for delay in streaming_delays() {
        let engine = query_engine(delay);
        let client = Client::new(engine.clone());

        let result = client
            .query("SELECT * FROM inventory WHERE kind = 'sensor'")
            .wait()
            .await?;

        assert_eq!(result.rows.len(), sample_rows().len());
        assert_eq!(result.rows, sample_rows());
        assert_eq!(result.meta.status, QueryStatus::Success);
        assert_eq!(result.meta, sample_meta());
        assert_eq!(engine.operations_started(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn test_query_statement_passes_through_verbatim() -> anyhow::Result<()> {
    let engine = query_engine(None);
    let client = Client::new(engine.clone());

    let statement = "SELECT site, AVG(reading) FROM inventory GROUP BY site";
    client.query(statement).wait().await?;

    assert_eq!(engine.last_query().unwrap().statement, statement);
    Ok(())
}

#[tokio::test]
async fn test_query_rows_via_listeners() -> anyhow::Result<()> {
    for delay in streaming_delays() {
        let engine = query_engine(delay);
        let client = Client::new(engine);

        let rows: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let meta: Arc<Mutex<Option<QueryMetaData>>> = Arc::new(Mutex::new(None));
        let done = Arc::new(tokio::sync::Notify::new());

        let stream = client.query("SELECT * FROM inventory");
        let rows_cb = Arc::clone(&rows);
        let meta_cb = Arc::clone(&meta);
        let done_cb = Arc::clone(&done);
        stream
            .on_row(move |row| rows_cb.lock().push(row.clone()))?
            .on_meta(move |m| *meta_cb.lock() = Some(m.clone()))?
            .on_end(move || done_cb.notify_one())?
            .on_error(|_| {})?;

        tokio::time::timeout(Duration::from_secs(2), done.notified()).await?;

        assert_eq!(*rows.lock(), sample_rows());
        assert_eq!(meta.lock().clone().unwrap(), sample_meta());
    }
    Ok(())
}

#[tokio::test]
async fn test_query_failure_rejects_with_engine_error() {
    let failure = ProducerError::new(8, "parsing failure");
    let engine = Arc::new(ScriptedEngine::new().with_query_script(
        OperationScript::new(sample_rows()).with_failure(failure.clone()),
    ));
    let client = Client::new(engine);

    let err = client.query("SELECT FROM").wait().await.unwrap_err();
    assert_eq!(err, Error::Producer(failure));
}

#[tokio::test]
async fn test_query_failure_via_listeners_fires_error_then_end() -> anyhow::Result<()> {
    let failure = ProducerError::new(8, "parsing failure");
    let engine = Arc::new(ScriptedEngine::new().with_query_script(
        OperationScript::new(sample_rows()).with_failure(failure.clone()),
    ));
    let client = Client::new(engine);

    let events = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(tokio::sync::Notify::new());

    let stream = client.query("SELECT FROM");
    let rows_log = Arc::clone(&events);
    let errors_log = Arc::clone(&events);
    let ends_log = Arc::clone(&events);
    let done_cb = Arc::clone(&done);
    stream
        .on_row(move |_| rows_log.lock().push("row"))?
        .on_error(move |_| errors_log.lock().push("error"))?
        .on_end(move || {
            ends_log.lock().push("end");
            done_cb.notify_one();
        })?;

    tokio::time::timeout(Duration::from_secs(2), done.notified()).await?;

    // No rows reach the consumer: one error callback, then one end callback
    assert_eq!(*events.lock(), vec!["error", "end"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_waits_invoke_engine_once() -> anyhow::Result<()> {
    let engine = Arc::new(
        ScriptedEngine::new().with_query_script(
            OperationScript::new(sample_rows())
                .with_metadata(sample_meta())
                .with_startup_delay(Duration::from_millis(30)),
        ),
    );
    let client = Client::new(engine.clone());

    let stream = Arc::new(client.query("SELECT * FROM inventory"));
    let first = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.wait().await })
    };
    let second = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.wait().await })
    };

    let first = first.await??;
    let second = second.await??;
    assert_eq!(first, second);
    assert_eq!(engine.operations_started(), 1);
    Ok(())
}

#[tokio::test]
async fn test_await_after_listen_is_rejected() {
    let engine = query_engine(None);
    let client = Client::new(engine);

    let stream = client.query("SELECT * FROM inventory");
    stream.on_row(|_| {}).unwrap();

    let err = stream.wait().await.unwrap_err();
    assert_eq!(err, Error::AlreadyListening);
}

#[tokio::test]
async fn test_listen_after_await_is_rejected() -> anyhow::Result<()> {
    let engine = query_engine(None);
    let client = Client::new(engine);

    let stream = client.query("SELECT * FROM inventory");
    stream.wait().await?;

    let err = stream.on_row(|_| {}).err().unwrap();
    assert_eq!(err, Error::AlreadyAwaited);
    Ok(())
}

#[tokio::test]
async fn test_get_all_replicas_resolves_in_arrival_order() -> anyhow::Result<()> {
    let reads = vec![
        sample_replica("active", false),
        sample_replica("replica-1", true),
        sample_replica("replica-2", true),
    ];
    let engine = Arc::new(
        ScriptedEngine::new().with_all_replicas_script(OperationScript::new(reads.clone())),
    );
    let client = Client::new(engine);

    let replicas = client.get_all_replicas("inventory::dev-0001").wait().await?;
    assert_eq!(replicas, reads);
    Ok(())
}

#[tokio::test]
async fn test_get_all_replicas_via_listeners() -> anyhow::Result<()> {
    let reads = vec![
        sample_replica("active", false),
        sample_replica("replica-1", true),
    ];
    let engine = Arc::new(
        ScriptedEngine::new().with_all_replicas_script(
            OperationScript::new(reads.clone()).with_item_delay(Duration::from_millis(2)),
        ),
    );
    let client = Client::new(engine);

    let seen = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(tokio::sync::Notify::new());

    let stream = client.get_all_replicas("inventory::dev-0001");
    let seen_cb = Arc::clone(&seen);
    let done_cb = Arc::clone(&done);
    stream
        .on_replica(move |_| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
        })?
        .on_end(move || done_cb.notify_one())?
        .on_error(|_| {})?;

    tokio::time::timeout(Duration::from_secs(2), done.notified()).await?;
    assert_eq!(seen.load(Ordering::SeqCst), reads.len());
    Ok(())
}

#[tokio::test]
async fn test_get_any_replica_returns_first_arrival() -> anyhow::Result<()> {
    let engine = Arc::new(ScriptedEngine::new().with_any_replica_script(OperationScript::new(
        vec![sample_replica("replica-2", true)],
    )));
    let client = Client::new(engine);

    let read = client.get_any_replica("inventory::dev-0004").await?;
    assert!(read.is_replica);
    assert_eq!(read.content, bytes::Bytes::from_static(b"replica-2"));
    Ok(())
}

#[tokio::test]
async fn test_get_any_replica_failure_propagates() {
    let failure = ProducerError::new(101, "document not found");
    let engine = Arc::new(ScriptedEngine::new().with_any_replica_script(
        OperationScript::<_, ()>::new(vec![]).with_failure(failure.clone()),
    ));
    let client = Client::new(engine);

    let err = client.get_any_replica("inventory::missing").await.unwrap_err();
    assert_eq!(err, Error::Producer(failure));
}

#[tokio::test]
async fn test_scan_request_passes_through_verbatim() -> anyhow::Result<()> {
    let engine = Arc::new(ScriptedEngine::new());
    let client = Client::new(engine.clone());

    let request = ScanRequest::Prefix {
        prefix: "inventory::dev-".into(),
    };
    client.scan(request.clone()).wait().await?;

    assert_eq!(engine.last_scan().unwrap(), request);
    Ok(())
}
