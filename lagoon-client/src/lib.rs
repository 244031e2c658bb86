/// LagoonDB Client Library
///
/// This crate provides the typed streaming surface over the native LagoonDB
/// engine: queries, replica reads and key-space scans, each returned as a
/// handle that can be awaited for the aggregate result or subscribed to for
/// item-by-item delivery.
pub mod client;
pub mod config;
pub mod engine;
pub mod query;
pub mod replica;
pub mod scan;

// Re-export key types
pub use client::Client;
pub use config::ClientConfig;
pub use engine::{DocumentEngine, QueryRequest, ReplicaReadRequest, ScanRequest};
pub use lagoon_core::{
    CancellationCell, ConsumptionMode, DeliveryOptions, Error, ProducerError, Result, ScanPhase,
    Signal, SignalKind, SignalSink,
};
pub use query::{QueryMetaData, QueryMetrics, QueryResult, QueryStatus, QueryWarning, RowStream};
pub use replica::{GetReplicaResult, ReplicaStream};
pub use scan::{ScanCancelHandle, ScanResult, ScanStream};
