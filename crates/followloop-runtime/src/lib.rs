//! # followloop Runtime
//!
//! Timing primitives shared by the agent and the orchestrator:
//!
//! - [`poll_until`] - bounded polling for a condition to appear
//! - [`RetryPolicy`] - retry with backoff and a retryable-error predicate
//! - [`pacing`] - jittered intervals and think time

pub mod pacing;
mod poll;
mod retry;

pub use pacing::{jittered_interval, think_time};
pub use poll::{PollConfig, PollError, poll_until};
pub use retry::{Backoff, RetryPolicy};
