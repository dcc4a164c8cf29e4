//! Manually released completions.
//!
//! A [`Gate`] captures the completion handle an operation receives and holds
//! it until the test releases it, so a test can act between the bridge's entry
//! checkpoint and its completion checkpoint.

use crate::sink::CompletionSink;
use parking_lot::Mutex;
use std::sync::Arc;

/// Holds a completion handle until released.
#[derive(Debug)]
pub struct Gate<C> {
    slot: Arc<Mutex<Option<C>>>,
}

impl<C> Gate<C>
where
    C: Send + 'static,
{
    /// An empty gate
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Capture `completion`. Call from the bridge's operation closure.
    pub fn hold(&self, completion: C) {
        *self.slot.lock() = Some(completion);
    }

    /// Whether a completion is being held
    pub fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Wait until the bridged operation has been started and its completion captured.
    pub async fn armed(&self) {
        while !self.is_armed() {
            tokio::task::yield_now().await;
        }
    }

    /// Take the held completion without invoking it
    pub fn take(&self) -> Option<C> {
        self.slot.lock().take()
    }

    /// Deliver `outcome` through the held completion. Returns `false` if none.
    pub fn release<R>(&self, outcome: R) -> bool
    where
        C: CompletionSink<R>,
    {
        match self.take() {
            Some(completion) => {
                completion.deliver(outcome);
                true
            }
            None => false,
        }
    }
}

impl<C> Clone for Gate<C> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<C> Default for Gate<C>
where
    C: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
