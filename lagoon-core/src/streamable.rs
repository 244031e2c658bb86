use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cancel::CancellationCell;
use crate::config::DeliveryOptions;
use crate::error::{Error, ProducerError, Result};
use crate::listener::ListenerSet;
use crate::mode::{ConsumptionMode, ModeCell};
use crate::signal::Signal;
use crate::state::ResultState;

type Reducer<R, I, M> = Box<dyn FnOnce(Vec<I>, Option<M>) -> R + Send>;

/// Mutable delivery state, guarded by one lock so parallel producer threads
/// and consumer calls serialize into a single delivery order.
struct State<R, I, M> {
    /// Items not yet handed to a listener or to the reduction
    buffer: Vec<I>,
    metadata: Option<M>,
    /// Captured failure; rejection happens at the terminal signal
    failure: Option<Error>,
    /// The terminal signal has been received
    end_seen: bool,
    outcome: ResultState<R>,
    /// Taken exactly once, strictly after the terminal signal
    reducer: Option<Reducer<R, I, M>>,
    listeners: ListenerSet<I, M>,
    metadata_delivered: bool,
    failure_delivered: bool,
    end_delivered: bool,
    /// The failure reached a consumer (listener, waiter, or warn log)
    failure_observed: bool,
}

impl<R, I, M> State<R, I, M> {
    /// Hand undelivered signals to whichever listeners exist, in canonical
    /// order: items, then metadata, then error, then end. Signals with no
    /// matching listener stay pending until the terminal has been delivered.
    fn flush(&mut self) {
        let State {
            buffer,
            metadata,
            failure,
            end_seen,
            listeners,
            metadata_delivered,
            failure_delivered,
            end_delivered,
            failure_observed,
            ..
        } = self;

        if !listeners.item.is_empty() && !buffer.is_empty() {
            for item in buffer.drain(..) {
                for callback in listeners.item.iter_mut() {
                    callback(&item);
                }
            }
        }

        if !*end_delivered {
            if let Some(meta) = metadata.as_ref() {
                if !*metadata_delivered && !listeners.metadata.is_empty() {
                    for callback in listeners.metadata.iter_mut() {
                        callback(meta);
                    }
                    *metadata_delivered = true;
                }
            }

            if let Some(err) = failure.as_ref() {
                if !*failure_delivered && !listeners.error.is_empty() {
                    for callback in listeners.error.iter_mut() {
                        callback(err);
                    }
                    *failure_delivered = true;
                    *failure_observed = true;
                }
            }
        }

        if *end_seen && !*end_delivered && !listeners.end.is_empty() {
            if let Some(err) = failure.as_ref() {
                if !*failure_delivered {
                    warn!(error = %err, "stream failed with no error listener attached");
                    *failure_observed = true;
                }
            }
            for callback in listeners.end.iter_mut() {
                callback();
            }
            *end_delivered = true;
            if !buffer.is_empty() {
                warn!(
                    dropped = buffer.len(),
                    "dropping undelivered item backlog at end of stream"
                );
                buffer.clear();
            }
        }
    }
}

struct Inner<R, I, M> {
    state: Mutex<State<R, I, M>>,
    mode: ModeCell,
    done: watch::Sender<bool>,
    options: DeliveryOptions,
    cancellation: Option<Arc<CancellationCell>>,
}

impl<R, I, M> Inner<R, I, M>
where
    R: Send + 'static,
    I: Send + 'static,
    M: Send + 'static,
{
    fn accept(&self, signal: Signal<I, M>) -> Result<()> {
        let mut st = self.state.lock();
        match signal {
            Signal::Item(item) => {
                if st.end_seen {
                    warn!("item received after the terminal signal; dropping");
                    return Ok(());
                }
                if st.failure.is_some() {
                    warn!("item received after a producer error; dropping");
                    return Ok(());
                }
                st.buffer.push(item);
                if st.listeners.item.is_empty() {
                    if let Some(cap) = self.options.max_buffered_items {
                        if st.buffer.len() > cap {
                            warn!(cap, "item backlog exceeded; operation will reject");
                            st.buffer.clear();
                            st.failure = Some(Error::BacklogExceeded(cap));
                            return Err(Error::BacklogExceeded(cap));
                        }
                    }
                }
                st.flush();
                Ok(())
            }
            Signal::Metadata(metadata) => {
                if st.end_seen {
                    warn!("metadata received after the terminal signal; dropping");
                    return Ok(());
                }
                st.metadata = Some(metadata);
                st.metadata_delivered = false;
                st.flush();
                Ok(())
            }
            Signal::Error(error) => {
                if st.end_seen {
                    warn!("error received after the terminal signal; dropping");
                    return Ok(());
                }
                // Items produced before the failure never reach the result
                st.buffer.clear();
                st.failure = Some(Error::Producer(error));
                st.failure_delivered = false;
                st.flush();
                Ok(())
            }
            Signal::End => {
                if st.end_seen {
                    return Err(Error::DuplicateTerminal);
                }
                st.end_seen = true;
                st.flush();
                drop(st);
                if let Some(cell) = &self.cancellation {
                    cell.mark_stopped();
                }
                self.settle();
                Ok(())
            }
        }
    }

    /// Move the memoized outcome out of `Pending` once the terminal signal
    /// has arrived. The reduction runs outside the lock, at most once.
    fn settle(&self) {
        let mut st = self.state.lock();
        if !st.end_seen || st.outcome.is_settled() {
            return;
        }
        if let Some(err) = st.failure.clone() {
            st.outcome = ResultState::Rejected(err.clone());
            drop(st);
            debug!(error = %err, "deferred result rejected");
            let _ = self.done.send(true);
            return;
        }
        if self.mode.get() != ConsumptionMode::AwaitSingleValue {
            return;
        }
        let Some(reduce) = st.reducer.take() else {
            return; // another caller is running the reduction
        };
        let items = std::mem::take(&mut st.buffer);
        let metadata = st.metadata.take();
        drop(st);

        let value = reduce(items, metadata);
        debug!("deferred result fulfilled");

        let mut st = self.state.lock();
        st.outcome = ResultState::Fulfilled(value);
        drop(st);
        let _ = self.done.send(true);
    }
}

trait SinkTarget<I, M>: Send + Sync {
    fn accept(&self, signal: Signal<I, M>) -> Result<()>;
}

impl<R, I, M> SinkTarget<I, M> for Inner<R, I, M>
where
    R: Send + 'static,
    I: Send + 'static,
    M: Send + 'static,
{
    fn accept(&self, signal: Signal<I, M>) -> Result<()> {
        Inner::accept(self, signal)
    }
}

/// Producer-side handle bound to one engine operation.
///
/// Cloneable so the engine may deliver from more than one thread; all
/// deliveries serialize on the primitive's internal lock, which defines the
/// production order consumers observe.
pub struct SignalSink<I, M> {
    target: Arc<dyn SinkTarget<I, M>>,
}

impl<I, M> Clone for SignalSink<I, M> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<I, M> std::fmt::Debug for SignalSink<I, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSink").finish_non_exhaustive()
    }
}

impl<I, M> SignalSink<I, M> {
    /// Deliver one signal. Returns the duplicate-terminal violation if the
    /// engine sends a second `End`, and the backlog error if the configured
    /// buffering cap is exceeded.
    pub fn push(&self, signal: Signal<I, M>) -> Result<()> {
        self.target.accept(signal)
    }

    /// Deliver one produced item
    pub fn item(&self, item: I) -> Result<()> {
        self.push(Signal::Item(item))
    }

    /// Deliver the one-shot summary record
    pub fn metadata(&self, metadata: M) -> Result<()> {
        self.push(Signal::Metadata(metadata))
    }

    /// Report a producer failure. Must be followed by exactly one `end()`.
    pub fn error(&self, error: ProducerError) -> Result<()> {
        self.push(Signal::Error(error))
    }

    /// Deliver the terminal signal
    pub fn end(&self) -> Result<()> {
        self.push(Signal::End)
    }
}

/// A value consumable either as one deferred result or as a stream of
/// discrete events, backed by a single engine operation.
///
/// The first consumption call of either kind fixes the style for the
/// lifetime of the instance: `wait`/`materialize` commit to awaiting the
/// reduced value, while any listener registration commits to streaming.
/// Items produced before that choice are buffered and honored by either
/// path. The opposite-mode call afterwards fails fast with a protocol
/// violation instead of opening a second delivery path.
pub struct StreamableResult<R, I, M> {
    inner: Arc<Inner<R, I, M>>,
}

impl<R, I, M> StreamableResult<R, I, M>
where
    R: Send + 'static,
    I: Send + 'static,
    M: Send + 'static,
{
    /// Create a primitive that reduces buffered items (and metadata, when
    /// present) into the deferred value
    pub fn new(reduce: impl FnOnce(Vec<I>, Option<M>) -> R + Send + 'static) -> Self {
        Self::build(Box::new(reduce), DeliveryOptions::default(), None)
    }

    /// Create a primitive with explicit delivery options
    pub fn with_options(
        reduce: impl FnOnce(Vec<I>, Option<M>) -> R + Send + 'static,
        options: DeliveryOptions,
    ) -> Self {
        Self::build(Box::new(reduce), options, None)
    }

    /// Create a primitive whose terminal signal also stops the given
    /// cancellation token (used by the scan flavor)
    pub fn with_cancellation(
        reduce: impl FnOnce(Vec<I>, Option<M>) -> R + Send + 'static,
        options: DeliveryOptions,
        cancellation: Arc<CancellationCell>,
    ) -> Self {
        Self::build(Box::new(reduce), options, Some(cancellation))
    }

    fn build(
        reducer: Reducer<R, I, M>,
        options: DeliveryOptions,
        cancellation: Option<Arc<CancellationCell>>,
    ) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    buffer: Vec::new(),
                    metadata: None,
                    failure: None,
                    end_seen: false,
                    outcome: ResultState::Pending,
                    reducer: Some(reducer),
                    listeners: ListenerSet::new(),
                    metadata_delivered: false,
                    failure_delivered: false,
                    end_delivered: false,
                    failure_observed: false,
                }),
                mode: ModeCell::new(),
                done,
                options,
                cancellation,
            }),
        }
    }

    /// The handle the engine fires with items and the terminal signal
    pub fn sink(&self) -> SignalSink<I, M> {
        SignalSink {
            target: self.inner.clone(),
        }
    }

    /// The consumption mode fixed so far
    pub fn consumption_mode(&self) -> ConsumptionMode {
        self.inner.mode.get()
    }

    /// Commit this instance to deferred consumption. Idempotent: repeated
    /// calls (and repeated `wait`s) observe the same memoized outcome. Fails
    /// with a protocol violation if listeners were registered first.
    pub fn materialize(&self) -> Result<()> {
        self.inner.mode.fix_await()?;
        self.inner.settle();
        Ok(())
    }

    /// Suspend until the operation settles, returning the reduced value or
    /// the captured error. Callable concurrently from any number of tasks;
    /// every caller observes the identical outcome.
    pub async fn wait(&self) -> Result<R>
    where
        R: Clone,
    {
        self.materialize()?;
        let mut done = self.inner.done.subscribe();
        loop {
            {
                let mut st = self.inner.state.lock();
                match &st.outcome {
                    ResultState::Fulfilled(value) => return Ok(value.clone()),
                    ResultState::Rejected(err) => {
                        let err = err.clone();
                        st.failure_observed = true;
                        return Err(err);
                    }
                    ResultState::Pending => {}
                }
            }
            let _ = done.changed().await;
        }
    }

    /// Register a callback for each produced item. The first registration of
    /// any kind fixes the instance to listener consumption; a backlog of
    /// items buffered before that point is replayed to the first item
    /// listener. Chainable.
    pub fn on_item(&self, callback: impl FnMut(&I) + Send + 'static) -> Result<&Self> {
        self.inner.mode.fix_listener()?;
        {
            let mut st = self.inner.state.lock();
            st.listeners.item.push(Box::new(callback));
            st.flush();
        }
        self.inner.settle();
        Ok(self)
    }

    /// Register a callback for the one-shot summary record. Chainable.
    pub fn on_metadata(&self, callback: impl FnMut(&M) + Send + 'static) -> Result<&Self> {
        self.inner.mode.fix_listener()?;
        {
            let mut st = self.inner.state.lock();
            st.listeners.metadata.push(Box::new(callback));
            st.flush();
        }
        self.inner.settle();
        Ok(self)
    }

    /// Register a callback for a producer failure. The failure callback
    /// always fires before the end callback. Chainable.
    pub fn on_error(&self, callback: impl FnMut(&Error) + Send + 'static) -> Result<&Self> {
        self.inner.mode.fix_listener()?;
        {
            let mut st = self.inner.state.lock();
            st.listeners.error.push(Box::new(callback));
            st.flush();
        }
        self.inner.settle();
        Ok(self)
    }

    /// Register a callback for the terminal signal, which fires exactly
    /// once, after any failure callback. Chainable.
    pub fn on_end(&self, callback: impl FnMut() + Send + 'static) -> Result<&Self> {
        self.inner.mode.fix_listener()?;
        {
            let mut st = self.inner.state.lock();
            st.listeners.end.push(Box::new(callback));
            st.flush();
        }
        self.inner.settle();
        Ok(self)
    }
}

impl<R, I, M> Drop for StreamableResult<R, I, M> {
    fn drop(&mut self) {
        let mut st = self.inner.state.lock();
        if st.failure_observed {
            return;
        }
        let unobserved = match (&st.outcome, &st.failure) {
            (ResultState::Rejected(err), _) => Some(err.clone()),
            (_, Some(err)) => Some(err.clone()),
            _ => None,
        };
        if let Some(err) = unobserved {
            st.failure_observed = true;
            warn!(error = %err, "streaming result dropped without observing its failure");
        }
    }
}

impl<R, I, M> std::fmt::Debug for StreamableResult<R, I, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamableResult")
            .field("mode", &self.inner.mode.get())
            .finish_non_exhaustive()
    }
}
