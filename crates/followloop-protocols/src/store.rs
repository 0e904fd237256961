//! Durable key-value store protocol.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Well-known store keys.
pub mod keys {
    /// Queue of pending records.
    pub const QUEUE: &str = "extractedUsers";
    /// History of followed records.
    pub const HISTORY: &str = "followedUsers";
    /// User settings.
    pub const SETTINGS: &str = "agentSettings";
    /// Control-loop state.
    pub const RUN_STATE: &str = "agentState";

    pub const ALL: [&str; 4] = [QUEUE, HISTORY, SETTINGS, RUN_STATE];
}

/// Asynchronous key-value store shared by every execution context.
///
/// Writes from one context become visible to another only once that context
/// re-reads; nothing is pushed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError>;

    /// Write every entry of `entries`.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError>;

    /// Delete the given keys.
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}
