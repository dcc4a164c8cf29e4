//! # Tether Core
//!
//! Bridges legacy APIs that report their outcome through a one-shot completion
//! callback into `async` calls that resume exactly once with a value or an
//! error.
//!
//! ```rust,no_run
//! use tether_core::{await_fallible, BridgeError};
//!
//! # async fn example() -> Result<(), BridgeError<std::io::Error>> {
//! let size: u64 = await_fallible(|done| {
//!     std::thread::spawn(move || done.complete(std::fs::metadata("Cargo.toml").map(|m| m.len())));
//! })
//! .await?;
//! # let _ = size;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `bridge/` - The [`Bridge`] and its fallible, shared and infallible variants
//! - `completion/` - Completion handles passed to the wrapped operation
//! - `cancellation/` - Cancellation signals and the ambient per-task scope
//! - `deadline/` - Liveness wrappers composed around bridged calls
//! - `config/` - [`BridgeConfig`] and its contract-violation policies
//! - `errors/` - [`BridgeError`], [`Cancelled`] and [`ConfigError`]

#![forbid(unsafe_code)]

pub mod bridge;
pub mod cancellation;
pub mod completion;
pub mod config;
pub mod deadline;
pub mod errors;

pub use bridge::{
    await_fallible, await_fallible_with, await_infallible, await_infallible_checked,
    await_infallible_checked_with, await_shared, await_shared_with, Bridge,
};
pub use cancellation::{CancellationFlag, CancellationScope, CancellationSignal, NeverCancel};
pub use completion::{Completion, InfallibleCompletion, SharedCompletion};
pub use config::{AbandonPolicy, BridgeConfig, DoubleCompletionPolicy};
pub use deadline::{until_cancelled, with_deadline, DeadlineElapsed};
pub use errors::{BridgeError, Cancelled, ConfigError};
