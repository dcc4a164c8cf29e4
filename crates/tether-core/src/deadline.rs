//! Liveness combinators for bridged calls.
//!
//! A bridged call resumes only when its operation calls back. These wrappers
//! sit outside the bridge and bound how long a caller waits. Dropping the
//! bridged future leaves the operation running; its eventual completion is
//! discarded.

use crate::cancellation::CancellationSignal;
use crate::errors::Cancelled;
use std::future::Future;
use std::time::Duration;

/// The deadline passed before the wrapped future resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} elapsed")]
pub struct DeadlineElapsed(pub Duration);

/// Resolve `future`, or fail once `deadline` has passed.
pub async fn with_deadline<F>(deadline: Duration, future: F) -> Result<F::Output, DeadlineElapsed>
where
    F: Future,
{
    tokio::time::timeout(deadline, future).await.map_err(|_| {
        tracing::debug!(?deadline, "deadline elapsed before completion");
        DeadlineElapsed(deadline)
    })
}

/// Resolve `future`, or fail as soon as `signal` is set.
///
/// Unlike the bridge's checkpoints this waits on the signal, so it also
/// releases callers whose operation never calls back.
pub async fn until_cancelled<F>(
    signal: &dyn CancellationSignal,
    future: F,
) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(Cancelled),
        output = future => Ok(output),
    }
}
