/// LagoonDB result-delivery primitives
///
/// A streaming database operation produces discrete items (query rows,
/// replica reads, scan hits) followed by exactly one terminal signal. This
/// crate implements the value that exposes such an operation to callers as
/// either a single awaitable result or a stream of listener events, with
/// exactly-once settlement in both styles.
pub mod cancel;
pub mod config;
pub mod error;
pub mod mode;
pub mod signal;
pub mod state;
pub mod streamable;

mod listener;

// Re-export key types
pub use cancel::{CancellationCell, ScanPhase};
pub use config::DeliveryOptions;
pub use error::{Error, ProducerError, Result};
pub use mode::ConsumptionMode;
pub use signal::{Signal, SignalKind};
pub use state::ResultState;
pub use streamable::{SignalSink, StreamableResult};
