//! Completion handles handed to legacy operations.
//!
//! Each handle owns the write end of one pending call's settlement slot. The
//! owned handles ([`Completion`], [`InfallibleCompletion`]) are consumed by
//! `complete`, so a second completion cannot be expressed. [`SharedCompletion`]
//! serves callback APIs that need a cloneable callback; there the first writer
//! wins and later writers are contract violations.
//!
//! All handles are `Send` whenever their payload is, and may be completed from
//! any thread or executor.

use crate::cancellation::CancellationSignal;
use crate::config::DoubleCompletionPolicy;
use crate::errors::{BridgeError, Cancelled};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

pub(crate) type Settlement<T, E> = Result<T, BridgeError<E>>;

/// Completion-time checkpoint.
fn cancelled_at_completion(signal: &dyn CancellationSignal) -> bool {
    let cancelled = signal.is_cancelled();
    if cancelled {
        tracing::debug!(
            checkpoint = "completion",
            "cancellation observed, discarding operation result"
        );
    }
    cancelled
}

fn settle<T, E>(signal: &dyn CancellationSignal, result: Result<T, E>) -> Settlement<T, E> {
    if cancelled_at_completion(signal) {
        return Err(BridgeError::Cancelled);
    }
    result.map_err(BridgeError::Operation)
}

fn deliver<S>(tx: oneshot::Sender<S>, settlement: S, trace: bool) {
    if tx.send(settlement).is_err() {
        // The awaiting future was dropped; nobody is left to resume.
        tracing::trace!("pending call dropped before settlement");
    } else if trace {
        tracing::trace!("pending call settled");
    }
}

/// Completion callback for a fallible operation.
#[must_use = "dropping a completion without invoking it abandons the pending call"]
pub struct Completion<T, E> {
    tx: oneshot::Sender<Settlement<T, E>>,
    signal: Arc<dyn CancellationSignal>,
    trace: bool,
}

impl<T, E> Completion<T, E> {
    pub(crate) fn new(
        tx: oneshot::Sender<Settlement<T, E>>,
        signal: Arc<dyn CancellationSignal>,
        trace: bool,
    ) -> Self {
        Self { tx, signal, trace }
    }

    /// Report the operation's outcome and settle the pending call.
    ///
    /// If the caller's cancellation signal is set at this moment, the call
    /// settles as cancelled and `result` is discarded.
    pub fn complete(self, result: Result<T, E>) {
        let settlement = settle(self.signal.as_ref(), result);
        deliver(self.tx, settlement, self.trace);
    }

    /// Complete with a value
    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    /// Complete with an error
    pub fn fail(self, error: E) {
        self.complete(Err(error));
    }

    /// Whether the caller has requested cancellation.
    ///
    /// Long-running operations may poll this to stop early; they must still
    /// complete, and the call settles as cancelled regardless of the outcome.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Whether the awaiting caller is gone, making completion a no-op.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Convert into a cloneable handle for callback APIs that reuse callbacks.
    pub fn into_shared(self, policy: DoubleCompletionPolicy) -> SharedCompletion<T, E> {
        SharedCompletion {
            inner: Arc::new(SharedSlot {
                tx: Mutex::new(Some(self.tx)),
                signal: self.signal,
                policy,
                trace: self.trace,
            }),
        }
    }
}

impl<T, E> fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("cancelled", &self.signal.is_cancelled())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Completion callback for an operation with no error channel.
///
/// Created by the bridge either unchecked, in which case cancellation is never
/// consulted, or checked, in which case it applies the completion checkpoint.
#[must_use = "dropping a completion without invoking it abandons the pending call"]
pub struct InfallibleCompletion<T> {
    tx: oneshot::Sender<Result<T, Cancelled>>,
    signal: Option<Arc<dyn CancellationSignal>>,
    trace: bool,
}

impl<T> InfallibleCompletion<T> {
    pub(crate) fn unchecked(tx: oneshot::Sender<Result<T, Cancelled>>, trace: bool) -> Self {
        Self {
            tx,
            signal: None,
            trace,
        }
    }

    pub(crate) fn checked(
        tx: oneshot::Sender<Result<T, Cancelled>>,
        signal: Arc<dyn CancellationSignal>,
        trace: bool,
    ) -> Self {
        Self {
            tx,
            signal: Some(signal),
            trace,
        }
    }

    /// Report the operation's value and settle the pending call.
    pub fn complete(self, value: T) {
        let settlement = match &self.signal {
            Some(signal) if cancelled_at_completion(signal.as_ref()) => Err(Cancelled),
            _ => Ok(value),
        };
        deliver(self.tx, settlement, self.trace);
    }

    /// Whether the caller has requested cancellation. Always false when unchecked.
    pub fn is_cancelled(&self) -> bool {
        self.signal
            .as_ref()
            .is_some_and(|signal| signal.is_cancelled())
    }

    /// Whether the awaiting caller is gone, making completion a no-op.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> fmt::Debug for InfallibleCompletion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfallibleCompletion")
            .field("checked", &self.signal.is_some())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

struct SharedSlot<T, E> {
    tx: Mutex<Option<oneshot::Sender<Settlement<T, E>>>>,
    signal: Arc<dyn CancellationSignal>,
    policy: DoubleCompletionPolicy,
    trace: bool,
}

/// Cloneable completion callback; the first completion settles the call.
pub struct SharedCompletion<T, E> {
    inner: Arc<SharedSlot<T, E>>,
}

impl<T, E> SharedCompletion<T, E> {
    /// Report the operation's outcome.
    ///
    /// Returns `true` if this call settled the pending call. A later call is a
    /// contract violation handled according to [`DoubleCompletionPolicy`].
    pub fn complete(&self, result: Result<T, E>) -> bool {
        // Take the sender under the lock, send outside it.
        let tx = self.inner.tx.lock().take();
        match tx {
            Some(tx) => {
                let settlement = settle(self.inner.signal.as_ref(), result);
                deliver(tx, settlement, self.inner.trace);
                true
            }
            None => {
                self.double_completion(result.is_ok());
                false
            }
        }
    }

    /// Complete with a value
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Complete with an error
    pub fn fail(&self, error: E) -> bool {
        self.complete(Err(error))
    }

    /// Whether a completion has already been accepted.
    pub fn is_settled(&self) -> bool {
        self.inner.tx.lock().is_none()
    }

    /// Whether the caller has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.inner.signal.is_cancelled()
    }

    fn double_completion(&self, was_ok: bool) {
        match self.inner.policy {
            DoubleCompletionPolicy::Panic => {
                panic!("completion callback invoked more than once (second outcome ok: {was_ok})")
            }
            DoubleCompletionPolicy::Log => {
                tracing::error!(
                    second_outcome_ok = was_ok,
                    "completion callback invoked more than once, outcome discarded"
                );
            }
        }
    }
}

impl<T, E> Clone for SharedCompletion<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for SharedCompletion<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCompletion")
            .field("settled", &self.is_settled())
            .field("policy", &self.inner.policy)
            .finish()
    }
}
