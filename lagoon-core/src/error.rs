use thiserror::Error;

/// A failure reported by the native engine while producing results.
///
/// The engine assigns a stable numeric code; this layer carries the value
/// verbatim onto the delivery channel without reclassifying it. Whichever
/// consumption mode is active observes the same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerError {
    /// Stable numeric code assigned by the engine
    pub code: u32,
    /// Human readable message from the engine
    pub message: String,
}

impl ProducerError {
    /// Create a producer error with the given code and message
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProducerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProducerError {}

/// Errors surfaced by the result-delivery layer.
///
/// Producer failures are carried through unchanged; the remaining variants
/// are programmer or engine contract errors raised by this layer itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}")]
    Producer(#[from] ProducerError),

    #[error("cannot await a result that is already registered for listeners")]
    AlreadyListening,

    #[error("cannot register listeners on a result that is already being awaited")]
    AlreadyAwaited,

    #[error("terminal signal delivered more than once")]
    DuplicateTerminal,

    #[error("buffered item backlog exceeded {0} items")]
    BacklogExceeded(usize),
}

impl Error {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Producer(_) => "PRODUCER_ERROR",
            Error::AlreadyListening => "ALREADY_LISTENING",
            Error::AlreadyAwaited => "ALREADY_AWAITED",
            Error::DuplicateTerminal => "DUPLICATE_TERMINAL",
            Error::BacklogExceeded(_) => "BACKLOG_EXCEEDED",
        }
    }

    /// Returns true if this error reports a misuse of the delivery contract
    /// (mixed consumption modes or a repeated terminal signal) rather than a
    /// failure produced by the engine.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Error::AlreadyListening | Error::AlreadyAwaited | Error::DuplicateTerminal
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
