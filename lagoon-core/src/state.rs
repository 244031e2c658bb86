use crate::error::Error;

/// Settlement state of a deferred result.
///
/// A result leaves `Pending` at most once, and only the terminal signal
/// drives the transition. Fulfilled-and-rejected is unrepresentable.
#[derive(Debug, Clone)]
pub enum ResultState<T> {
    /// No terminal signal has been observed yet
    Pending,
    /// The operation completed and the reduced value is available
    Fulfilled(T),
    /// The operation failed with the captured error
    Rejected(Error),
}

impl<T> ResultState<T> {
    /// Returns true while no terminal signal has settled this result
    pub fn is_pending(&self) -> bool {
        matches!(self, ResultState::Pending)
    }

    /// Returns true once the result has been fulfilled or rejected
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Settle out of `Pending`. Returns false without touching the state if
    /// a terminal outcome was already recorded.
    pub fn settle(&mut self, outcome: Result<T, Error>) -> bool {
        if self.is_settled() {
            return false;
        }
        *self = match outcome {
            Ok(value) => ResultState::Fulfilled(value),
            Err(err) => ResultState::Rejected(err),
        };
        true
    }
}

impl<T> Default for ResultState<T> {
    fn default() -> Self {
        ResultState::Pending
    }
}
