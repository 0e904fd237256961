//! # followloop Queue
//!
//! The work backlog (queue) and the permanent follow log (history).
//!
//! [`model`] holds pure operations over in-memory lists; [`TaskQueue`]
//! applies them against the shared store, re-reading on every call.

pub mod metrics;
pub mod model;
mod task_queue;

pub use metrics::QueueMetrics;
pub use model::{
    enqueue_if_new, mark_followed, mark_unfollowed, next_follow_candidate,
    next_unfollow_candidate, remove_queued,
};
pub use task_queue::TaskQueue;
