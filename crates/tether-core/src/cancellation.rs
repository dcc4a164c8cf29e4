//! Cooperative cancellation signals.
//!
//! Cancellation is owned by whatever infrastructure surrounds a bridged call.
//! The bridge only ever reads a signal, at its checkpoints; it never sets one.
//!
//! A signal can be passed explicitly, or installed as the ambient signal of the
//! current task with [`CancellationScope::run`]. Code that runs outside any
//! scope sees [`NeverCancel`].

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation signal.
#[async_trait]
pub trait CancellationSignal: Send + Sync {
    /// Resolves once cancellation is requested.
    async fn cancelled(&self);

    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool;
}

/// Cancellation signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

#[async_trait]
impl CancellationSignal for NeverCancel {
    async fn cancelled(&self) {
        futures::future::pending::<()>().await;
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Settable cancellation flag shared between a canceller and its observers.
///
/// Clones observe the same flag. Once set it stays set.
#[derive(Debug, Clone)]
pub struct CancellationFlag {
    state: Arc<watch::Sender<bool>>,
}

impl CancellationFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let was_cancelled = self.state.send_replace(true);
        if !was_cancelled {
            tracing::debug!("cancellation requested");
        }
    }

    /// This flag as a shareable signal.
    pub fn signal(&self) -> Arc<dyn CancellationSignal> {
        Arc::new(self.clone())
    }
}

impl Default for CancellationFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CancellationSignal for CancellationFlag {
    async fn cancelled(&self) {
        let mut observer = self.state.subscribe();
        loop {
            if *observer.borrow() {
                return;
            }
            if observer.changed().await.is_err() {
                return;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }
}

tokio::task_local! {
    static AMBIENT: Arc<dyn CancellationSignal>;
}

/// Access to the ambient, per-task cancellation signal.
#[derive(Debug, Clone, Copy)]
pub struct CancellationScope;

impl CancellationScope {
    /// Run `future` with `signal` installed as its ambient cancellation signal.
    ///
    /// Scopes nest; the innermost signal wins.
    pub async fn run<F>(signal: Arc<dyn CancellationSignal>, future: F) -> F::Output
    where
        F: Future,
    {
        AMBIENT.scope(signal, future).await
    }

    /// The ambient signal, or [`NeverCancel`] outside any scope.
    pub fn current() -> Arc<dyn CancellationSignal> {
        AMBIENT
            .try_with(Arc::clone)
            .unwrap_or_else(|_| Arc::new(NeverCancel))
    }

    /// Whether the ambient signal is set.
    pub fn is_cancelled() -> bool {
        AMBIENT
            .try_with(|signal| signal.is_cancelled())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flag_starts_unset_and_stays_set() {
        let flag = CancellationFlag::new();
        assert!(!flag.is_cancelled());

        flag.cancel();
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        let signal = flag.signal();

        flag.cancel();
        assert!(observer.is_cancelled());
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let flag = CancellationFlag::new();
        let canceller = flag.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), flag.cancelled())
            .await
            .expect("cancelled() should resolve once the flag is set");
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_set() {
        let flag = CancellationFlag::new();
        flag.cancel();
        flag.cancelled().await;
    }

    #[tokio::test]
    async fn test_never_cancel_stays_pending() {
        let result =
            tokio::time::timeout(Duration::from_millis(10), NeverCancel.cancelled()).await;
        assert!(result.is_err());
        assert!(!NeverCancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_outside_scope_reads_never_cancel() {
        assert!(!CancellationScope::is_cancelled());
        assert!(!CancellationScope::current().is_cancelled());
    }

    #[tokio::test]
    async fn test_scope_installs_ambient_signal() {
        let flag = CancellationFlag::new();
        flag.cancel();

        let observed = CancellationScope::run(flag.signal(), async {
            (
                CancellationScope::is_cancelled(),
                CancellationScope::current().is_cancelled(),
            )
        })
        .await;

        assert_eq!(observed, (true, true));
        assert!(!CancellationScope::is_cancelled());
    }

    #[tokio::test]
    async fn test_inner_scope_wins() {
        let outer = CancellationFlag::new();
        outer.cancel();

        let inner_view = CancellationScope::run(outer.signal(), async {
            CancellationScope::run(Arc::new(NeverCancel), async {
                CancellationScope::is_cancelled()
            })
            .await
        })
        .await;

        assert!(!inner_view);
    }
}
