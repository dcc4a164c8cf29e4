//! Callback-to-async bridge
//!
//! Wraps a legacy operation that reports its outcome through a one-shot
//! completion callback and exposes it as a single `async` call. The caller is
//! suspended until the callback fires, then resumes exactly once.
//!
//! # Cancellation
//!
//! Cancellation is cooperative and observed at two checkpoints only:
//!
//! - **entry**: a set signal fails the call before the operation is started;
//! - **completion**: a set signal replaces whatever outcome the callback
//!   delivered with a cancellation.
//!
//! Cancellation requested between the checkpoints is not seen until the
//! completion checkpoint. An operation that never calls back leaves the caller
//! suspended; compose with [`crate::deadline`] when liveness matters.
//!
//! The plain infallible variant never consults cancellation and never fails.
//! Callers whose policy requires cancellation there use the `_checked` variant.

use crate::cancellation::{CancellationScope, CancellationSignal};
use crate::completion::{Completion, InfallibleCompletion, SharedCompletion};
use crate::config::{AbandonPolicy, BridgeConfig};
use crate::errors::{BridgeError, Cancelled};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Entry checkpoint.
fn cancelled_at_entry(signal: &dyn CancellationSignal) -> bool {
    let cancelled = signal.is_cancelled();
    if cancelled {
        tracing::debug!(
            checkpoint = "entry",
            "cancellation observed, operation not started"
        );
    }
    cancelled
}

/// Adapter from completion-callback operations to `async` calls.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    /// Create a bridge with the given configuration
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Run a fallible operation under the ambient cancellation signal.
    pub async fn await_fallible<T, E, Op>(&self, operation: Op) -> Result<T, BridgeError<E>>
    where
        Op: FnOnce(Completion<T, E>),
    {
        self.await_fallible_with(CancellationScope::current(), operation)
            .await
    }

    /// Run a fallible operation under an explicit cancellation signal.
    ///
    /// The operation is invoked at most once, and only if `signal` is unset at
    /// entry. A value or error it reports passes through unchanged unless
    /// `signal` is set when the completion fires.
    pub async fn await_fallible_with<T, E, Op>(
        &self,
        signal: Arc<dyn CancellationSignal>,
        operation: Op,
    ) -> Result<T, BridgeError<E>>
    where
        Op: FnOnce(Completion<T, E>),
    {
        if cancelled_at_entry(signal.as_ref()) {
            return Err(BridgeError::Cancelled);
        }

        let (tx, rx) = oneshot::channel();
        operation(Completion::new(tx, signal, self.config.trace_settlements));

        match rx.await {
            Ok(settlement) => settlement,
            Err(_) => {
                self.abandoned().await;
                Err(BridgeError::Abandoned)
            }
        }
    }

    /// Run a fallible operation that needs a cloneable callback, under the
    /// ambient cancellation signal.
    pub async fn await_shared<T, E, Op>(&self, operation: Op) -> Result<T, BridgeError<E>>
    where
        Op: FnOnce(SharedCompletion<T, E>),
    {
        self.await_shared_with(CancellationScope::current(), operation)
            .await
    }

    /// Run a fallible operation that needs a cloneable callback.
    ///
    /// Same contract as [`Bridge::await_fallible_with`]; the first completion
    /// settles the call and later ones are contract violations.
    pub async fn await_shared_with<T, E, Op>(
        &self,
        signal: Arc<dyn CancellationSignal>,
        operation: Op,
    ) -> Result<T, BridgeError<E>>
    where
        Op: FnOnce(SharedCompletion<T, E>),
    {
        let policy = self.config.double_completion;
        self.await_fallible_with(signal, |completion| {
            operation(completion.into_shared(policy));
        })
        .await
    }

    /// Run an operation with no error channel. Never fails.
    ///
    /// Cancellation is not consulted at either checkpoint. A completion handle
    /// dropped without being invoked leaves the call suspended.
    pub async fn await_infallible<T, Op>(&self, operation: Op) -> T
    where
        Op: FnOnce(InfallibleCompletion<T>),
    {
        let (tx, rx) = oneshot::channel();
        operation(InfallibleCompletion::unchecked(
            tx,
            self.config.trace_settlements,
        ));

        match rx.await {
            Ok(Ok(value)) => value,
            // Unchecked completions never settle as cancelled.
            Ok(Err(Cancelled)) => futures::future::pending().await,
            Err(_) => {
                tracing::warn!(
                    "infallible completion handle dropped without being invoked, \
                     call will not resume"
                );
                futures::future::pending().await
            }
        }
    }

    /// Run an operation with no error channel, observing the ambient
    /// cancellation signal at both checkpoints.
    pub async fn await_infallible_checked<T, Op>(&self, operation: Op) -> Result<T, Cancelled>
    where
        Op: FnOnce(InfallibleCompletion<T>),
    {
        self.await_infallible_checked_with(CancellationScope::current(), operation)
            .await
    }

    /// Run an operation with no error channel, observing `signal` at both
    /// checkpoints. An abandoned handle under [`AbandonPolicy::Fail`] also
    /// settles as cancelled.
    pub async fn await_infallible_checked_with<T, Op>(
        &self,
        signal: Arc<dyn CancellationSignal>,
        operation: Op,
    ) -> Result<T, Cancelled>
    where
        Op: FnOnce(InfallibleCompletion<T>),
    {
        if cancelled_at_entry(signal.as_ref()) {
            return Err(Cancelled);
        }

        let (tx, rx) = oneshot::channel();
        operation(InfallibleCompletion::checked(
            tx,
            signal,
            self.config.trace_settlements,
        ));

        match rx.await {
            Ok(settlement) => settlement,
            Err(_) => {
                self.abandoned().await;
                Err(Cancelled)
            }
        }
    }

    /// Handle a completion dropped without being invoked. Returns only under
    /// [`AbandonPolicy::Fail`].
    async fn abandoned(&self) {
        tracing::warn!(
            policy = %self.config.abandon_policy,
            "completion handle dropped without being invoked"
        );
        if self.config.abandon_policy == AbandonPolicy::Pend {
            futures::future::pending::<()>().await;
        }
    }
}

/// [`Bridge::await_fallible`] with the default configuration.
pub async fn await_fallible<T, E, Op>(operation: Op) -> Result<T, BridgeError<E>>
where
    Op: FnOnce(Completion<T, E>),
{
    Bridge::default().await_fallible(operation).await
}

/// [`Bridge::await_fallible_with`] with the default configuration.
pub async fn await_fallible_with<T, E, Op>(
    signal: Arc<dyn CancellationSignal>,
    operation: Op,
) -> Result<T, BridgeError<E>>
where
    Op: FnOnce(Completion<T, E>),
{
    Bridge::default()
        .await_fallible_with(signal, operation)
        .await
}

/// [`Bridge::await_shared`] with the default configuration.
pub async fn await_shared<T, E, Op>(operation: Op) -> Result<T, BridgeError<E>>
where
    Op: FnOnce(SharedCompletion<T, E>),
{
    Bridge::default().await_shared(operation).await
}

/// [`Bridge::await_shared_with`] with the default configuration.
pub async fn await_shared_with<T, E, Op>(
    signal: Arc<dyn CancellationSignal>,
    operation: Op,
) -> Result<T, BridgeError<E>>
where
    Op: FnOnce(SharedCompletion<T, E>),
{
    Bridge::default().await_shared_with(signal, operation).await
}

/// [`Bridge::await_infallible`] with the default configuration.
pub async fn await_infallible<T, Op>(operation: Op) -> T
where
    Op: FnOnce(InfallibleCompletion<T>),
{
    Bridge::default().await_infallible(operation).await
}

/// [`Bridge::await_infallible_checked`] with the default configuration.
pub async fn await_infallible_checked<T, Op>(operation: Op) -> Result<T, Cancelled>
where
    Op: FnOnce(InfallibleCompletion<T>),
{
    Bridge::default().await_infallible_checked(operation).await
}

/// [`Bridge::await_infallible_checked_with`] with the default configuration.
pub async fn await_infallible_checked_with<T, Op>(
    signal: Arc<dyn CancellationSignal>,
    operation: Op,
) -> Result<T, Cancelled>
where
    Op: FnOnce(InfallibleCompletion<T>),
{
    Bridge::default()
        .await_infallible_checked_with(signal, operation)
        .await
}
