use bytes::Bytes;

use lagoon_core::{DeliveryOptions, Error, Result, SignalSink, StreamableResult};

/// A document as read from one of its copies.
///
/// The content is the raw stored value; transcoding into application types
/// happens in layers above this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetReplicaResult {
    /// Content of the document as it existed on that node
    pub content: Bytes,
    /// CAS of the document as known by that node
    pub cas: u64,
    /// Whether this copy came from a replica rather than the active node
    pub is_replica: bool,
}

/// Dual-mode handle for replica reads.
///
/// Replica reads carry no secondary meta-data: the engine emits one item per
/// responding copy, in arrival order, then the terminal signal.
pub struct ReplicaStream<T> {
    inner: StreamableResult<T, GetReplicaResult, ()>,
}

impl<T: Send + 'static> ReplicaStream<T> {
    /// Create a handle that reduces arrival-ordered replica reads
    pub fn new(
        reduce: impl FnOnce(Vec<GetReplicaResult>, Option<()>) -> T + Send + 'static,
    ) -> Self {
        Self {
            inner: StreamableResult::new(reduce),
        }
    }

    /// Create a handle with explicit delivery options
    pub fn with_options(
        reduce: impl FnOnce(Vec<GetReplicaResult>, Option<()>) -> T + Send + 'static,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            inner: StreamableResult::with_options(reduce, options),
        }
    }

    /// The handle the engine fires with replica reads and the terminal
    pub fn sink(&self) -> SignalSink<GetReplicaResult, ()> {
        self.inner.sink()
    }

    /// Register a callback for each replica read. Chainable.
    pub fn on_replica(
        &self,
        callback: impl FnMut(&GetReplicaResult) + Send + 'static,
    ) -> Result<&Self> {
        self.inner.on_item(callback)?;
        Ok(self)
    }

    /// Register a callback for a read failure. Chainable.
    pub fn on_error(&self, callback: impl FnMut(&Error) + Send + 'static) -> Result<&Self> {
        self.inner.on_error(callback)?;
        Ok(self)
    }

    /// Register a callback for the end of the replica stream. Chainable.
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

impl<T> std::fmt::Debug for ReplicaStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaStream").finish_non_exhaustive()
    }
}
