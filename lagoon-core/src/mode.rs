use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};

/// How a result instance is being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionMode {
    /// No consumption call has been made yet
    Unselected,
    /// The caller awaits one reduced value
    AwaitSingleValue,
    /// The caller registered listeners for discrete events
    ListenerStream,
}

const UNSELECTED: u8 = 0;
const AWAIT_SINGLE_VALUE: u8 = 1;
const LISTENER_STREAM: u8 = 2;

/// Fixes the consumption mode of one result instance at most once.
///
/// The first consumption call of either kind wins the compare-and-swap; a
/// later call belonging to the other mode fails fast instead of opening a
/// second, divergent delivery path. The swap happens before any delivery
/// decision consults the mode.
#[derive(Debug, Default)]
pub struct ModeCell {
    mode: AtomicU8,
}

impl ModeCell {
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(UNSELECTED),
        }
    }

    /// The currently fixed mode
    pub fn get(&self) -> ConsumptionMode {
        match self.mode.load(Ordering::Acquire) {
            AWAIT_SINGLE_VALUE => ConsumptionMode::AwaitSingleValue,
            LISTENER_STREAM => ConsumptionMode::ListenerStream,
            _ => ConsumptionMode::Unselected,
        }
    }

    /// Fix the mode to awaiting a single value. Idempotent across repeated
    /// awaits; fails if listeners were registered first.
    pub fn fix_await(&self) -> Result<()> {
        match self.mode.compare_exchange(
            UNSELECTED,
            AWAIT_SINGLE_VALUE,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) | Err(AWAIT_SINGLE_VALUE) => Ok(()),
            Err(_) => Err(Error::AlreadyListening),
        }
    }

    /// Fix the mode to listener streaming. Idempotent across repeated
    /// registrations; fails if the result is already being awaited.
    pub fn fix_listener(&self) -> Result<()> {
        match self.mode.compare_exchange(
            UNSELECTED,
            LISTENER_STREAM,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) | Err(LISTENER_STREAM) => Ok(()),
            Err(_) => Err(Error::AlreadyAwaited),
        }
    }
}
