//! Bridge scenario tests
//!
//! Covers pass-through of values and errors, both cancellation checkpoints,
//! completion from other threads and tasks, the infallible variants, contract
//! violations, and the liveness wrappers.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    await_fallible, await_fallible_with, await_infallible, until_cancelled, with_deadline,
    AbandonPolicy, Bridge, BridgeConfig, BridgeError, CancellationFlag, CancellationScope,
    Cancelled, Completion, DeadlineElapsed, DoubleCompletionPolicy, InfallibleCompletion,
    NeverCancel,
};
use tether_testkit::{init_test_tracing, Executor, Gate, ScriptedOperation};

#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupError {
    Missing,
    Denied(String),
}

#[tokio::test]
async fn synchronous_success_returns_value() {
    init_test_tracing();
    let op = ScriptedOperation::new(Ok::<u32, LookupError>(42));

    let result = await_fallible(|done| op.run(done)).await;

    assert_eq!(result, Ok(42));
}

#[tokio::test]
async fn failure_passes_through_unchanged() {
    let op = ScriptedOperation::new(Err::<u32, _>(LookupError::Denied("alice".into())));

    let result = await_fallible(|done| op.run(done)).await;

    assert_eq!(
        result,
        Err(BridgeError::Operation(LookupError::Denied("alice".into())))
    );
}

#[tokio::test]
async fn cancelled_before_call_never_starts_operation() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let op = ScriptedOperation::new(Ok::<u32, LookupError>(1));
    let starts = op.start_counter();

    let result = await_fallible_with(flag.signal(), |done| op.run(done)).await;

    assert_eq!(result, Err(BridgeError::Cancelled));
    assert_eq!(starts.get(), 0);
}

#[tokio::test]
async fn cancellation_before_completion_overrides_success() {
    let flag = CancellationFlag::new();
    let op = ScriptedOperation::new(Ok::<u32, LookupError>(7)).cancelling(flag.clone());
    let starts = op.start_counter();

    let result = await_fallible_with(flag.signal(), |done| op.run(done)).await;

    assert_eq!(result, Err(BridgeError::Cancelled));
    assert_eq!(starts.get(), 1);
}

#[tokio::test]
async fn cancellation_before_completion_overrides_failure() {
    let flag = CancellationFlag::new();
    let op = ScriptedOperation::new(Err::<u32, _>(LookupError::Missing))
        .on(Executor::Thread)
        .cancelling(flag.clone());

    let result = await_fallible_with(flag.signal(), |done| op.run(done)).await;

    assert_eq!(result, Err(BridgeError::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completion_from_another_thread() {
    let op = ScriptedOperation::new(Ok::<&str, LookupError>("remote"))
        .on(Executor::Thread)
        .after(Duration::from_millis(5));

    let result = await_fallible(|done| op.run(done)).await;

    assert_eq!(result, Ok("remote"));
}

#[tokio::test]
async fn completion_from_spawned_task() {
    let op = ScriptedOperation::new(Ok::<u64, LookupError>(99))
        .on(Executor::Task)
        .after(Duration::from_millis(2));

    assert_eq!(await_fallible(|done| op.run(done)).await, Ok(99));
}

#[tokio::test]
async fn cancellation_between_checkpoints_is_seen_at_completion() {
    let flag = CancellationFlag::new();
    let gate: Gate<Completion<u32, LookupError>> = Gate::new();
    let holder = gate.clone();
    let signal = flag.signal();

    let call = tokio::spawn(async move {
        await_fallible_with(signal, |done| holder.hold(done)).await
    });

    gate.armed().await;
    flag.cancel();
    assert!(gate.release(Ok(7)));

    assert_eq!(call.await.unwrap(), Err(BridgeError::Cancelled));
}

#[tokio::test]
async fn ambient_scope_drives_checkpoints() {
    let flag = CancellationFlag::new();
    let op = ScriptedOperation::new(Ok::<u32, LookupError>(3)).cancelling(flag.clone());

    let result = CancellationScope::run(flag.signal(), await_fallible(|done| op.run(done))).await;

    assert!(result.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn infallible_returns_value_even_when_cancelled() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let op = ScriptedOperation::new(String::from("cached")).on(Executor::Thread);

    let value = CancellationScope::run(flag.signal(), await_infallible(|done| op.run(done))).await;

    assert_eq!(value, "cached");
}

#[tokio::test]
async fn infallible_checked_fails_only_on_cancellation() {
    let bridge = Bridge::default();

    let ok = bridge
        .await_infallible_checked_with(Arc::new(NeverCancel), |done| {
            ScriptedOperation::new(5u8).on(Executor::Task).run(done);
        })
        .await;
    assert_eq!(ok, Ok(5));

    let flag = CancellationFlag::new();
    let op = ScriptedOperation::new(5u8).cancelling(flag.clone());
    let cancelled = bridge
        .await_infallible_checked_with(flag.signal(), |done| op.run(done))
        .await;
    assert_eq!(cancelled, Err(Cancelled));
}

#[tokio::test]
async fn abandoned_completion_fails_by_default() {
    let op = ScriptedOperation::new(Ok::<u32, LookupError>(1)).on(Executor::Abandon);

    assert_eq!(
        await_fallible(|done| op.run(done)).await,
        Err(BridgeError::Abandoned)
    );
}

#[tokio::test]
async fn abandoned_completion_pends_when_configured() {
    let bridge = Bridge::new(BridgeConfig {
        abandon_policy: AbandonPolicy::Pend,
        ..BridgeConfig::default()
    });
    let op = ScriptedOperation::new(Ok::<u32, LookupError>(1)).on(Executor::Abandon);

    let outcome = with_deadline(
        Duration::from_millis(20),
        bridge.await_fallible(|done| op.run(done)),
    )
    .await;

    assert_eq!(outcome, Err(DeadlineElapsed(Duration::from_millis(20))));
}

#[tokio::test]
async fn never_completing_operation_is_released_by_deadline() {
    let gate: Gate<Completion<u32, LookupError>> = Gate::new();

    let outcome = with_deadline(
        Duration::from_millis(20),
        await_fallible(|done| gate.hold(done)),
    )
    .await;

    assert!(outcome.is_err());
    assert!(gate.is_armed());
    // The late completion goes nowhere.
    assert!(gate.release(Ok(1)));
}

#[tokio::test]
async fn never_completing_operation_is_released_by_cancellation() {
    let flag = CancellationFlag::new();
    let gate: Gate<InfallibleCompletion<u32>> = Gate::new();
    let canceller = flag.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        canceller.cancel();
    });

    let outcome = until_cancelled(&flag, await_infallible(|done| gate.hold(done))).await;

    assert_eq!(outcome, Err(Cancelled));
}

#[tokio::test]
async fn shared_completion_ignores_second_outcome_under_log_policy() {
    let bridge = Bridge::new(BridgeConfig {
        double_completion: DoubleCompletionPolicy::Log,
        ..BridgeConfig::default()
    });

    let mut worker = None;
    let result: Result<u32, BridgeError<LookupError>> = bridge
        .await_shared(|done| {
            let again = done.clone();
            worker = Some(std::thread::spawn(move || {
                (done.succeed(11), again.fail(LookupError::Missing))
            }));
        })
        .await;

    assert_eq!(result, Ok(11));
    let (first_settled, second_settled) = worker.unwrap().join().unwrap();
    assert!(first_settled);
    assert!(!second_settled);
}

#[tokio::test]
async fn config_file_drives_bridge() {
    let config =
        BridgeConfig::from_toml_str("abandon_policy = \"fail\"\ntrace_settlements = true")
            .unwrap();
    let bridge = Bridge::new(config);
    assert!(bridge.config().trace_settlements);

    let op = ScriptedOperation::new(Ok::<u32, LookupError>(2));
    assert_eq!(bridge.await_fallible(|done| op.run(done)).await, Ok(2));
}
