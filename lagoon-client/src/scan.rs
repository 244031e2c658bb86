use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use lagoon_core::{
    CancellationCell, DeliveryOptions, Error, Result, ScanPhase, SignalSink, StreamableResult,
};

/// One hit from a key-space scan.
///
/// Content, cas and expiry are absent for id-only scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Document id
    pub id: String,
    /// Raw document content, when the scan fetched bodies
    pub content: Option<Bytes>,
    /// CAS of the document at scan time
    pub cas: Option<u64>,
    /// Expiry as seconds since the epoch, when one is set
    pub expiry_time: Option<u64>,
}

impl ScanResult {
    /// A hit from an id-only scan
    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: None,
            cas: None,
            expiry_time: None,
        }
    }
}

/// Cloneable handle that can request cancellation of its scan stream.
///
/// Safe to invoke from inside a listener callback, which is where consumers
/// typically decide they have seen enough.
#[derive(Debug, Clone)]
pub struct ScanCancelHandle {
    cell: Arc<CancellationCell>,
}

impl ScanCancelHandle {
    /// Request early termination of the stream. Advisory: items already in
    /// flight may still be delivered before the terminal signal arrives.
    pub fn cancel_streaming(&self) {
        if self.cell.request_cancel() {
            debug!("scan cancellation requested");
        }
    }
}

/// Dual-mode handle for key-space scans.
///
/// Scans carry no secondary meta-data: the engine emits one item per hit, in
/// arrival order, then the terminal signal. In addition to the usual two
/// consumption styles the stream can be cancelled mid-flight.
pub struct ScanStream<T> {
    inner: StreamableResult<T, ScanResult, ()>,
    cancel: Arc<CancellationCell>,
}

impl<T: Send + 'static> ScanStream<T> {
    /// Create a handle that reduces arrival-ordered scan hits
    pub fn new(reduce: impl FnOnce(Vec<ScanResult>, Option<()>) -> T + Send + 'static) -> Self {
        Self::with_options(reduce, DeliveryOptions::default())
    }

    /// Create a handle with explicit delivery options
    pub fn with_options(
        reduce: impl FnOnce(Vec<ScanResult>, Option<()>) -> T + Send + 'static,
        options: DeliveryOptions,
    ) -> Self {
        let cancel = Arc::new(CancellationCell::new());
        Self {
            inner: StreamableResult::with_cancellation(reduce, options, Arc::clone(&cancel)),
            cancel,
        }
    }

    /// The handle the engine fires with scan hits and the terminal
    pub fn sink(&self) -> SignalSink<ScanResult, ()> {
        self.inner.sink()
    }

    /// The cancellation token the engine polls between emissions
    pub fn cancellation(&self) -> Arc<CancellationCell> {
        Arc::clone(&self.cancel)
    }

    /// A cloneable cancel handle, for use inside listener callbacks
    pub fn cancel_handle(&self) -> ScanCancelHandle {
        ScanCancelHandle {
            cell: Arc::clone(&self.cancel),
        }
    }

    /// Request early termination of the stream. Advisory: items already in
    /// flight may still be delivered and are still aggregated.
    pub fn cancel_streaming(&self) {
        if self.cancel.request_cancel() {
            debug!("scan cancellation requested");
        }
    }

    /// Returns true once cancellation has been requested, whether or not
    /// the stream has stopped since
    pub fn cancel_requested(&self) -> bool {
        self.cancel.cancel_requested()
    }

    /// Where the stream stands with respect to cancellation
    pub fn phase(&self) -> ScanPhase {
        self.cancel.phase()
    }

    /// Register a callback for each scan hit. Chainable.
    pub fn on_result(&self, callback: impl FnMut(&ScanResult) + Send + 'static) -> Result<&Self> {
        self.inner.on_item(callback)?;
        Ok(self)
    }

    /// Register a callback for a scan failure. Chainable.
    pub fn on_error(&self, callback: impl FnMut(&Error) + Send + 'static) -> Result<&Self> {
        self.inner.on_error(callback)?;
        Ok(self)
    }

    /// Register a callback for the end of the scan stream. Chainable.
    pub fn on_end(&self, callback: impl FnMut() + Send + 'static) -> Result<&Self> {
        self.inner.on_end(callback)?;
        Ok(self)
    }

    /// Await the reduced result
    pub async fn wait(&self) -> Result<T>
    where
        T: Clone,
    {
        self.inner.wait().await
    }
}

impl<T> std::fmt::Debug for ScanStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanStream")
            .field("phase", &self.cancel.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_hits_reduce_in_arrival_order() {
        let stream = ScanStream::new(|hits, _| hits);
        let sink = stream.sink();
        sink.item(ScanResult::id_only("doc-1")).unwrap();
        sink.item(ScanResult::id_only("doc-2")).unwrap();
        sink.end().unwrap();

        let hits = stream.wait().await.unwrap();
        assert_eq!(hits[0].id, "doc-1");
        assert_eq!(hits[1].id, "doc-2");
        assert_eq!(stream.phase(), ScanPhase::Stopped);
        assert!(!stream.cancel_requested());
    }

    #[tokio::test]
    async fn test_cancel_transitions_and_latches() {
        let stream: ScanStream<Vec<ScanResult>> = ScanStream::new(|hits, _| hits);
        stream.cancel_streaming();
        assert_eq!(stream.phase(), ScanPhase::CancelRequested);
        assert!(stream.cancellation().should_stop());

        let sink = stream.sink();
        sink.end().unwrap();
        assert_eq!(stream.phase(), ScanPhase::Stopped);
        assert!(stream.cancel_requested());
    }

    #[tokio::test]
    async fn test_items_in_flight_after_cancel_are_still_aggregated() {
        let stream = ScanStream::new(|hits: Vec<ScanResult>, _| hits);
        let sink = stream.sink();
        sink.item(ScanResult::id_only("doc-1")).unwrap();
        stream.cancel_streaming();
        sink.item(ScanResult::id_only("doc-2")).unwrap();
        sink.end().unwrap();

        let hits = stream.wait().await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
