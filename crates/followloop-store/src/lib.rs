//! # followloop Store
//!
//! Durable key-value storage shared by every execution context.
//!
//! - [`MemoryStore`] - in-process store for tests and ephemeral runs
//! - [`FileStore`] - one JSON document per key on disk
//! - [`AgentStore`] - typed access to queue, history, settings and run state

mod file;
mod memory;
mod typed;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use typed::{AgentStore, Snapshot};
