//! Proptest strategies over cancellation and completion timing.

use crate::scripted::{Executor, ScriptedOperation};
use proptest::prelude::*;
use std::time::Duration;
use tether_core::{BridgeError, CancellationFlag, Cancelled};

/// One interleaving of cancellation requests and completion timing.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Cancellation is requested before the call is made
    pub cancel_at_entry: bool,
    /// Cancellation is requested right before the completion fires
    pub cancel_before_completion: bool,
    /// Where the completion fires
    pub executor: Executor,
    /// Delay before the completion fires
    pub delay: Option<Duration>,
    /// The operation's own outcome
    pub outcome: Result<u32, String>,
}

impl Schedule {
    /// Build the scripted operation for this schedule, cancelling `flag` if asked.
    pub fn operation(&self, flag: &CancellationFlag) -> ScriptedOperation<Result<u32, String>> {
        let mut op = ScriptedOperation::new(self.outcome.clone()).on(self.executor);
        if let Some(delay) = self.delay {
            op = op.after(delay);
        }
        if self.cancel_before_completion {
            op = op.cancelling(flag.clone());
        }
        op
    }

    /// The settlement the bridge must produce for this schedule.
    pub fn expected(&self) -> Result<u32, BridgeError<String>> {
        if self.cancel_at_entry || self.cancel_before_completion {
            return Err(BridgeError::Cancelled);
        }
        self.outcome.clone().map_err(BridgeError::Operation)
    }

    /// The settlement a checked infallible call must produce, treating the
    /// whole scripted outcome as the value.
    pub fn expected_checked(&self) -> Result<Result<u32, String>, Cancelled> {
        if self.cancel_at_entry || self.cancel_before_completion {
            return Err(Cancelled);
        }
        Ok(self.outcome.clone())
    }

    /// How many times the operation must have been started.
    pub fn expected_starts(&self) -> usize {
        usize::from(!self.cancel_at_entry)
    }
}

/// Executors that eventually invoke their completion
pub fn arb_completing_executor() -> impl Strategy<Value = Executor> {
    prop_oneof![
        Just(Executor::Inline),
        Just(Executor::Task),
        Just(Executor::Thread),
    ]
}

/// Success or failure outcomes
pub fn arb_outcome() -> impl Strategy<Value = Result<u32, String>> {
    prop_oneof![
        any::<u32>().prop_map(Ok),
        any::<u8>().prop_map(|code| Err(format!("error-{code}"))),
    ]
}

/// Schedules whose operation eventually completes
pub fn arb_schedule() -> impl Strategy<Value = Schedule> {
    (
        any::<bool>(),
        any::<bool>(),
        arb_completing_executor(),
        proptest::option::of(0u64..3).prop_map(|ms| ms.map(Duration::from_millis)),
        arb_outcome(),
    )
        .prop_map(
            |(cancel_at_entry, cancel_before_completion, executor, delay, outcome)| Schedule {
                cancel_at_entry,
                cancel_before_completion,
                executor,
                delay,
                outcome,
            },
        )
}
