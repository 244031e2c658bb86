/// LagoonDB client entry point
use std::sync::Arc;

use tracing::debug;

use lagoon_core::{Error, ProducerError, Result};

use crate::config::ClientConfig;
use crate::engine::{DocumentEngine, QueryRequest, ReplicaReadRequest, ScanRequest};
use crate::query::{QueryResult, RowStream};
use crate::replica::{GetReplicaResult, ReplicaStream};
use crate::scan::{ScanResult, ScanStream};

/// LagoonDB client for streaming operations.
///
/// Every operation starts exactly one engine call and returns a dual-mode
/// handle: await it for the aggregate result, or register listeners to
/// stream items as they arrive.
pub struct Client {
    engine: Arc<dyn DocumentEngine>,
    config: ClientConfig,
}

impl Client {
    /// Create a client over the given engine with default configuration
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self::with_config(engine, ClientConfig::default())
    }

    /// Create a client with explicit configuration
    pub fn with_config(engine: Arc<dyn DocumentEngine>, config: ClientConfig) -> Self {
        Self { engine, config }
    }

    /// Execute a query
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use lagoon_client::{Client, DocumentEngine};
    /// # async fn example(engine: Arc<dyn DocumentEngine>) -> lagoon_client::Result<()> {
    /// let client = Client::new(engine);
    ///
    /// let result = client
    ///     .query("SELECT name FROM inventory WHERE kind = 'sensor'")
    ///     .wait()
    ///     .await?;
    /// println!("{} rows", result.rows.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn query(&self, statement: impl Into<String>) -> RowStream<QueryResult> {
        let request = QueryRequest {
            statement: statement.into(),
        };
        debug!(statement = %request.statement, "starting query operation");

        let stream = RowStream::with_options(
            |rows, meta| QueryResult {
                rows,
                meta: meta.unwrap_or_default(),
            },
            self.config.delivery.clone(),
        );
        self.engine.start_query(request, stream.sink());
        stream
    }

    /// Read every available copy of a document, in arrival order
    pub fn get_all_replicas(&self, id: impl Into<String>) -> ReplicaStream<Vec<GetReplicaResult>> {
        let request = ReplicaReadRequest { id: id.into() };
        debug!(id = %request.id, "starting get-all-replicas operation");

        let stream = ReplicaStream::with_options(|replicas, _| replicas, self.config.delivery.clone());
        self.engine.start_get_all_replicas(request, stream.sink());
        stream
    }

    /// Read a document from whichever copy responds first
    pub async fn get_any_replica(&self, id: impl Into<String>) -> Result<GetReplicaResult> {
        let request = ReplicaReadRequest { id: id.into() };
        debug!(id = %request.id, "starting get-any-replica operation");

        let stream: ReplicaStream<Vec<GetReplicaResult>> =
            ReplicaStream::with_options(|replicas, _| replicas, self.config.delivery.clone());
        self.engine.start_get_any_replica(request, stream.sink());

        let mut replicas = stream.wait().await?;
        if replicas.is_empty() {
            return Err(Error::Producer(ProducerError::new(
                0,
                "engine completed an any-replica read without a result",
            )));
        }
        Ok(replicas.remove(0))
    }

    /// Scan the key space, returning a handle that additionally supports
    /// mid-stream cancellation
    pub fn scan(&self, request: ScanRequest) -> ScanStream<Vec<ScanResult>> {
        debug!(request = ?request, "starting scan operation");

        let stream = ScanStream::with_options(|hits, _| hits, self.config.delivery.clone());
        self.engine
            .start_scan(request, stream.sink(), stream.cancellation());
        stream
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
