use std::sync::Arc;

use serde_json::Value;

use lagoon_core::{CancellationCell, SignalSink};

use crate::query::QueryMetaData;
use crate::replica::GetReplicaResult;
use crate::scan::ScanResult;

/// A query to start on the engine. The statement is passed through
/// verbatim; option parsing and placeholder binding happen in layers above
/// this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub statement: String,
}

/// A replica read to start on the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaReadRequest {
    /// Fully qualified document id
    pub id: String,
}

/// A key-space scan descriptor, passed through to the engine verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRequest {
    /// Documents with ids inside the inclusive range
    Range {
        from: Option<String>,
        to: Option<String>,
    },
    /// Documents whose id starts with the prefix
    Prefix { prefix: String },
    /// A random sample of at most `limit` documents
    Sampling { limit: u64, seed: Option<u64> },
}

/// The narrow surface this layer consumes from the native engine.
///
/// Each method starts exactly one operation. The engine then fires the sink
/// zero or more times with items in production order, at most once with
/// metadata (queries only, after the last item), at most once with an
/// error, and exactly once with the terminal signal, which always comes
/// last. Connection management, dispatch, retries and the wire protocol all
/// live behind this trait.
pub trait DocumentEngine: Send + Sync {
    /// Start a query; rows arrive as decoded JSON values
    fn start_query(&self, request: QueryRequest, sink: SignalSink<Value, QueryMetaData>);

    /// Start a read of every available copy of a document
    fn start_get_all_replicas(
        &self,
        request: ReplicaReadRequest,
        sink: SignalSink<GetReplicaResult, ()>,
    );

    /// Start a read that completes with the first copy to respond
    fn start_get_any_replica(
        &self,
        request: ReplicaReadRequest,
        sink: SignalSink<GetReplicaResult, ()>,
    );

    /// Start a key-space scan. The engine must poll `cancel` between
    /// emissions and deliver its terminal signal soon after a cancel
    /// request is observed; items already in flight may still be emitted.
    fn start_scan(
        &self,
        request: ScanRequest,
        sink: SignalSink<ScanResult, ()>,
        cancel: Arc<CancellationCell>,
    );
}
