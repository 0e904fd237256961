//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use followloop_protocols::{KeyValueStore, StoreError};

/// In-memory key-value store for testing.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, values: HashMap<String, Value>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.extend(values);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_keys_absent() {
        let store = MemoryStore::new();
        store
            .set(HashMap::from([("a".to_string(), json!(1))]))
            .await
            .unwrap();

        let got = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));
    }

    #[tokio::test]
    async fn test_set_overwrites_and_remove() {
        let store = MemoryStore::new();
        store
            .set(HashMap::from([("a".to_string(), json!("x"))]))
            .await
            .unwrap();
        store
            .set(HashMap::from([("a".to_string(), json!("y"))]))
            .await
            .unwrap();
        assert_eq!(store.get(&["a"]).await.unwrap()["a"], json!("y"));

        store.remove(&["a"]).await.unwrap();
        assert!(store.get(&["a"]).await.unwrap().is_empty());
    }
}
