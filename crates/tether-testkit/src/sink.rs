//! Uniform delivery over the different completion handles.

use tether_core::{Completion, InfallibleCompletion, SharedCompletion};

/// A completion handle that accepts an outcome of type `R`.
pub trait CompletionSink<R>: Send + 'static {
    /// Deliver `outcome` through the handle.
    fn deliver(self, outcome: R);
}

impl<T, E> CompletionSink<Result<T, E>> for Completion<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn deliver(self, outcome: Result<T, E>) {
        self.complete(outcome);
    }
}

impl<T, E> CompletionSink<Result<T, E>> for SharedCompletion<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn deliver(self, outcome: Result<T, E>) {
        self.complete(outcome);
    }
}

impl<T> CompletionSink<T> for InfallibleCompletion<T>
where
    T: Send + 'static,
{
    fn deliver(self, outcome: T) {
        self.complete(outcome);
    }
}
