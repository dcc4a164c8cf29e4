//! Scripted legacy operations.

use crate::sink::CompletionSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_core::CancellationFlag;

/// Where a scripted operation invokes its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executor {
    /// Before the operation returns, on the caller's thread; a delay blocks it
    Inline,
    /// On a spawned tokio task
    Task,
    /// On a freshly spawned OS thread
    Thread,
    /// Never; the completion is dropped without being invoked
    Abandon,
}

/// Side-channel count of how many times an operation was started.
#[derive(Debug, Clone, Default)]
pub struct StartCounter(Arc<AtomicUsize>);

impl StartCounter {
    /// Current count
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A legacy operation that completes with a fixed outcome.
#[derive(Debug)]
pub struct ScriptedOperation<R> {
    outcome: R,
    executor: Executor,
    delay: Option<Duration>,
    cancel_first: Option<CancellationFlag>,
    starts: StartCounter,
}

impl<R> ScriptedOperation<R>
where
    R: Send + 'static,
{
    /// Complete inline with `outcome`
    pub fn new(outcome: R) -> Self {
        Self {
            outcome,
            executor: Executor::Inline,
            delay: None,
            cancel_first: None,
            starts: StartCounter::default(),
        }
    }

    /// Complete on `executor`
    pub fn on(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    /// Wait `delay` before completing.
    ///
    /// With [`Executor::Inline`] the wait is a `std::thread::sleep` on the
    /// caller's thread, which blocks the runtime worker for its duration. Keep
    /// inline delays to a few milliseconds.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set `flag` immediately before completing
    pub fn cancelling(mut self, flag: CancellationFlag) -> Self {
        self.cancel_first = Some(flag);
        self
    }

    /// Counter shared with this operation
    pub fn start_counter(&self) -> StartCounter {
        self.starts.clone()
    }

    /// Start the operation, handing it `completion`.
    ///
    /// Use from the bridge's operation closure: `|done| op.run(done)`.
    pub fn run<C>(self, completion: C)
    where
        C: CompletionSink<R>,
    {
        self.starts.bump();
        let Self {
            outcome,
            executor,
            delay,
            cancel_first,
            ..
        } = self;

        tracing::trace!(?executor, ?delay, "scripted operation started");
        let finish = move || {
            if let Some(flag) = cancel_first {
                flag.cancel();
            }
            completion.deliver(outcome);
        };

        match executor {
            Executor::Inline => {
                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }
                finish();
            }
            Executor::Task => {
                tokio::spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    finish();
                });
            }
            Executor::Thread => {
                std::thread::spawn(move || {
                    if let Some(delay) = delay {
                        std::thread::sleep(delay);
                    }
                    finish();
                });
            }
            Executor::Abandon => drop(finish),
        }
    }
}
