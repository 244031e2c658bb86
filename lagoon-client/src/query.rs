use serde::{Deserialize, Serialize};
use serde_json::Value;

use lagoon_core::{DeliveryOptions, Error, Result, SignalSink, StreamableResult};

/// Status of a query at the time its meta-data was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// The query is still running
    Running,
    /// The query completed successfully
    Success,
    /// The query completed with errors
    Errors,
    /// The query completed but the outcome was unknown
    Completed,
    /// The query was stopped
    Stopped,
    /// The query timed out during execution
    Timeout,
    /// A connection was closed during execution
    Closed,
    /// The query stopped with fatal errors
    Fatal,
    /// The query was aborted while executing
    Aborted,
    /// The status of the query is unknown
    Unknown,
}

/// A warning generated during the execution of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWarning {
    /// Numeric code associated with the warning
    pub code: u32,
    /// Human readable representation of the warning
    pub message: String,
}

/// Metrics reported by the query engine following execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    /// Total time spent running the query, in milliseconds
    pub elapsed_time: u64,
    /// Total time spent executing the query, in milliseconds
    pub execution_time: u64,
    /// Number of rows that took part in sorting
    pub sort_count: u64,
    /// Number of rows in the result set
    pub result_count: u64,
    /// Number of bytes generated as part of the result set
    pub result_size: u64,
    /// Number of rows altered by the query
    pub mutation_count: u64,
    /// Number of errors encountered during execution
    pub error_count: u64,
    /// Number of warnings encountered during execution
    pub warning_count: u64,
}

/// Meta-data returned from a query, delivered once after the last row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetaData {
    /// Request id associated with the executed query
    pub request_id: String,
    /// Client context id associated with the executed query
    pub client_context_id: String,
    /// Status of the query when the meta-data was generated
    pub status: QueryStatus,
    /// Signature of the query result
    pub signature: Option<Value>,
    /// Warnings that occurred during execution
    pub warnings: Vec<QueryWarning>,
    /// Metrics made available by the query engine
    pub metrics: Option<QueryMetrics>,
    /// Profiling details generated during execution
    pub profile: Option<Value>,
}

impl Default for QueryMetaData {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            client_context_id: String::new(),
            status: QueryStatus::Unknown,
            signature: None,
            warnings: Vec::new(),
            metrics: None,
            profile: None,
        }
    }
}

/// Result of a query: the rows plus the meta-data describing the run
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<TRow = Value> {
    /// Rows returned by the query
    pub rows: Vec<TRow>,
    /// Meta-data returned by the query
    pub meta: QueryMetaData,
}

/// Dual-mode handle for row-producing operations.
///
/// Consume it either by awaiting `wait()` for the reduced result, or by
/// registering listeners for the `row`, `meta`, `error` and `end` events.
/// The first call of either kind fixes the consumption style for the
/// lifetime of the handle; the opposite-mode call afterwards fails fast.
pub struct RowStream<T> {
    inner: StreamableResult<T, Value, QueryMetaData>,
}

impl<T: Send + 'static> RowStream<T> {
    /// Create a handle that reduces rows and meta-data into the final value
    pub fn new(reduce: impl FnOnce(Vec<Value>, Option<QueryMetaData>) -> T + Send + 'static) -> Self {
        Self {
            inner: StreamableResult::new(reduce),
        }
    }

    /// Create a handle with explicit delivery options
    pub fn with_options(
        reduce: impl FnOnce(Vec<Value>, Option<QueryMetaData>) -> T + Send + 'static,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            inner: StreamableResult::with_options(reduce, options),
        }
    }

    /// The handle the engine fires with rows, meta-data and the terminal
    pub fn sink(&self) -> SignalSink<Value, QueryMetaData> {
        self.inner.sink()
    }

    /// Register a callback for each result row. Chainable.
    pub fn on_row(&self, callback: impl FnMut(&Value) + Send + 'static) -> Result<&Self> {
        self.inner.on_item(callback)?;
        Ok(self)
    }

    /// Register a callback for the one-shot query meta-data. Chainable.
    pub fn on_meta(&self, callback: impl FnMut(&QueryMetaData) + Send + 'static) -> Result<&Self> {
        self.inner.on_metadata(callback)?;
        Ok(self)
    }

    /// Register a callback for a query failure. Chainable.
    pub fn on_error(&self, callback: impl FnMut(&Error) + Send + 'static) -> Result<&Self> {
        self.inner.on_error(callback)?;
        Ok(self)
    }

    /// Register a callback for the end of the row stream. Chainable.
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

impl<T> std::fmt::Debug for RowStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}
