//! Typed accessors over a [`KeyValueStore`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use followloop_protocols::{KeyValueStore, RunState, Settings, StoreError, UserRecord, keys};

/// Everything a decision point needs, read in one round trip.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub queue: Vec<UserRecord>,
    pub history: Vec<UserRecord>,
    pub settings: Settings,
    pub run_state: RunState,
}

/// Typed view of the shared store. Cheap to clone.
///
/// Every call goes to the backing store; nothing is cached.
#[derive(Clone)]
pub struct AgentStore {
    inner: Arc<dyn KeyValueStore>,
}

impl AgentStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// The backing store.
    pub fn raw(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner
    }

    /// Read queue, history, settings and run state together.
    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let mut values = self.inner.get(&keys::ALL).await?;
        Ok(Snapshot {
            queue: decode(&mut values, keys::QUEUE)?,
            history: decode(&mut values, keys::HISTORY)?,
            settings: decode(&mut values, keys::SETTINGS)?,
            run_state: decode(&mut values, keys::RUN_STATE)?,
        })
    }

    pub async fn queue(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.read(keys::QUEUE).await
    }

    pub async fn history(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.read(keys::HISTORY).await
    }

    /// Stored settings, or defaults when none are stored.
    pub async fn settings(&self) -> Result<Settings, StoreError> {
        self.read(keys::SETTINGS).await
    }

    /// Stored run state, or the idle default.
    pub async fn run_state(&self) -> Result<RunState, StoreError> {
        self.read(keys::RUN_STATE).await
    }

    pub async fn save_queue(&self, queue: &[UserRecord]) -> Result<(), StoreError> {
        self.write(&[(keys::QUEUE, to_value(queue)?)]).await
    }

    pub async fn save_history(&self, history: &[UserRecord]) -> Result<(), StoreError> {
        self.write(&[(keys::HISTORY, to_value(history)?)]).await
    }

    /// Write history, then queue.
    ///
    /// A failure between the two leaves a record in both lists, never in neither.
    pub async fn save_lists(
        &self,
        queue: &[UserRecord],
        history: &[UserRecord],
    ) -> Result<(), StoreError> {
        self.save_history(history).await?;
        self.save_queue(queue).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.write(&[(keys::SETTINGS, to_value(settings)?)]).await
    }

    pub async fn save_run_state(&self, state: &RunState) -> Result<(), StoreError> {
        self.write(&[(keys::RUN_STATE, to_value(state)?)]).await
    }

    /// Read-modify-write of the run state. Returns the stored result.
    pub async fn update_run_state<F>(&self, f: F) -> Result<RunState, StoreError>
    where
        F: FnOnce(&mut RunState),
    {
        let mut state = self.run_state().await?;
        f(&mut state);
        self.save_run_state(&state).await?;
        Ok(state)
    }

    /// Prepare the store for use.
    ///
    /// Missing lists become empty, missing settings become `defaults`, and the
    /// run state is reset so no stale session survives a reinstall.
    pub async fn initialize(&self, defaults: &Settings) -> Result<(), StoreError> {
        let existing = self.inner.get(&keys::ALL).await?;
        let mut entries: Vec<(&str, Value)> = Vec::new();

        if !existing.contains_key(keys::QUEUE) {
            entries.push((keys::QUEUE, Value::Array(Vec::new())));
        }
        if !existing.contains_key(keys::HISTORY) {
            entries.push((keys::HISTORY, Value::Array(Vec::new())));
        }
        if !existing.contains_key(keys::SETTINGS) {
            entries.push((keys::SETTINGS, to_value(defaults)?));
        }
        entries.push((keys::RUN_STATE, to_value(&RunState::default())?));

        self.write(&entries).await?;
        info!("Store initialized ({} keys written)", entries.len());
        Ok(())
    }

    async fn read<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let mut values = self.inner.get(&[key]).await?;
        decode(&mut values, key)
    }

    async fn write(&self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        let map: HashMap<String, Value> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        debug!("Writing keys {:?}", map.keys().collect::<Vec<_>>());
        self.inner.set(map).await
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

/// Take `key` out of `values`; missing or null decodes to the default.
fn decode<T>(values: &mut HashMap<String, Value>, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match values.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::Utc;
    use serde_json::json;

    fn store() -> AgentStore {
        AgentStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_missing_keys_decode_to_defaults() {
        let snapshot = store().snapshot().await.unwrap();
        assert!(snapshot.queue.is_empty());
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.settings, Settings::default());
        assert!(!snapshot.run_state.is_running);
    }

    #[tokio::test]
    async fn test_initialize_preserves_lists_and_resets_state() {
        let store = store();
        store.save_queue(&[UserRecord::new("alice")]).await.unwrap();
        store
            .save_run_state(&RunState {
                is_running: true,
                current_user: Some("alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let defaults = Settings {
            enable_auto_follow: false,
            ..Default::default()
        };
        store.initialize(&defaults).await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.queue.len(), 1);
        assert!(!snapshot.run_state.is_running);
        assert!(snapshot.run_state.current_user.is_none());
        assert!(!snapshot.settings.enable_auto_follow);
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_settings() {
        let store = store();
        let custom = Settings {
            daily_follow_limit: 10,
            ..Default::default()
        };
        store.save_settings(&custom).await.unwrap();
        store.initialize(&Settings::default()).await.unwrap();
        assert_eq!(store.settings().await.unwrap().daily_follow_limit, 10);
    }

    #[tokio::test]
    async fn test_update_run_state() {
        let store = store();
        let updated = store
            .update_run_state(|s| s.log_error("alice", "boom", Utc::now(), 50))
            .await
            .unwrap();
        assert_eq!(updated.errors.len(), 1);
        assert_eq!(store.run_state().await.unwrap().errors.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_value_reported() {
        let raw = Arc::new(MemoryStore::new());
        raw.set(HashMap::from([(keys::QUEUE.to_string(), json!("nope"))]))
            .await
            .unwrap();
        let store = AgentStore::new(raw);
        assert!(matches!(
            store.queue().await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
