//! # followloop Protocols
//!
//! Shared data model and trait seams for the followloop workspace.
//! Contains only definitions; storage, page automation and orchestration
//! live in their own crates.
//!
//! ## Core Traits
//!
//! - [`KeyValueStore`] - Durable asynchronous key-value store
//! - [`PageDriver`] - Automation surface of a single browser page
//! - [`PageChannel`] - Message transport between orchestrator and page context

pub mod channel;
pub mod error;
pub mod message;
pub mod page;
pub mod record;
pub mod settings;
pub mod state;
pub mod store;

pub use channel::{PageChannel, PageId, ScriptKind, ScriptStatus};
pub use error::{ChannelError, PageError, StoreError};
pub use message::{AgentCommand, CommandResponse, ExtractOptions, ExtractSummary, FollowStatus};
pub use page::{ExtractionPage, FollowProbe, FollowState, PageControl, PageDriver, ProfileDraft, ScrollProgress};
pub use record::{RecordStatus, UserRecord, is_valid_username, same_username};
pub use settings::Settings;
pub use state::{DailyStats, ErrorEntry, HourlyCounts, RunState};
pub use store::{KeyValueStore, keys};
