use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Phase of a streaming operation with respect to cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// The engine is (or may still be) producing items
    Streaming,
    /// Early termination was requested; trailing items may still arrive
    CancelRequested,
    /// The terminal signal has been delivered
    Stopped,
}

const STREAMING: u8 = 0;
const CANCEL_REQUESTED: u8 = 1;
const STOPPED: u8 = 2;

/// Cooperative cancellation token shared between a scan consumer and the
/// engine producing its items.
///
/// Cancellation is advisory: the engine is expected to poll the token
/// between emissions, stop producing, and deliver its terminal signal, but
/// there is no bound on how many in-flight items still arrive after a
/// request. Items that do arrive are delivered normally.
#[derive(Debug, Default)]
pub struct CancellationCell {
    phase: AtomicU8,
    /// Latches on the first request and never clears, so consumers can still
    /// tell a cancelled stream from one that ran to completion
    requested: AtomicBool,
}

impl CancellationCell {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(STREAMING),
            requested: AtomicBool::new(false),
        }
    }

    /// The current phase
    pub fn phase(&self) -> ScanPhase {
        match self.phase.load(Ordering::Acquire) {
            CANCEL_REQUESTED => ScanPhase::CancelRequested,
            STOPPED => ScanPhase::Stopped,
            _ => ScanPhase::Streaming,
        }
    }

    /// Request early termination. Returns true on the Streaming to
    /// CancelRequested transition; false if cancellation was already
    /// requested or the stream already stopped.
    pub fn request_cancel(&self) -> bool {
        self.requested.store(true, Ordering::Release);
        self.phase
            .compare_exchange(
                STREAMING,
                CANCEL_REQUESTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Returns true once cancellation has ever been requested
    pub fn cancel_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Engine-side poll: returns true while a cancel request is waiting to
    /// be honored with a terminal signal
    pub fn should_stop(&self) -> bool {
        self.phase.load(Ordering::Acquire) == CANCEL_REQUESTED
    }

    /// Record that the terminal signal arrived and streaming is over
    pub fn mark_stopped(&self) {
        self.phase.store(STOPPED, Ordering::Release);
    }
}
