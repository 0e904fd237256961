//! # followloop Agent
//!
//! The polling state machine hosted in the automated page.
//!
//! On every page load the agent reads the persisted run state, decides
//! whether the page is the expected target, performs one queue step and
//! navigates to the next target. [`machine`] holds the pure transition
//! functions; [`FollowAgent`] wires them to the store and the page.

mod agent;
mod agent_actions;
mod agent_extract;
mod error;
pub mod machine;

pub use agent::{ActionScope, FollowAgent, PassOutcome, StartOutcome};
pub use error::{AgentError, AgentResult};
pub use machine::{AgentPhase, StopReason};
