//! Tether Testing Infrastructure
//!
//! Simulated legacy operations for exercising the bridge: operations that
//! complete with a scripted outcome inline, on a tokio task or on a plain
//! thread, optionally after a delay or after requesting cancellation, and
//! gates that hold a completion until a test releases it.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! tether-testkit = { path = "../tether-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,no_run
//! use tether_testkit::*;
//!
//! # async fn example() {
//! let op = ScriptedOperation::new(Ok::<u32, String>(42)).on(Executor::Thread);
//! let starts = op.start_counter();
//! let value = tether_core::await_fallible(|done| op.run(done)).await;
//! assert_eq!(value, Ok(42));
//! assert_eq!(starts.get(), 1);
//! # }
//! ```

pub mod gate;
pub mod logging;
pub mod scripted;
pub mod sink;
pub mod strategies;

pub use gate::Gate;
pub use logging::init_test_tracing;
pub use scripted::{Executor, ScriptedOperation, StartCounter};
pub use sink::CompletionSink;
pub use strategies::Schedule;
