//! File system backed store.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use followloop_protocols::{KeyValueStore, StoreError};

/// File system based key-value store.
///
/// Each key is stored as its own JSON document:
/// ```text
/// {storage_path}/
/// ├── extractedUsers.json
/// ├── followedUsers.json
/// ├── agentSettings.json
/// └── agentState.json
/// ```
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never observes a half-written document.
pub struct FileStore {
    /// Base storage path.
    storage_path: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `storage_path`.
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let storage_path = storage_path.into();
        fs::create_dir_all(&storage_path).await.map_err(|e| {
            StoreError::Io(format!(
                "Failed to create storage directory {:?}: {}",
                storage_path, e
            ))
        })?;

        debug!("FileStore initialized at {:?}", storage_path);

        Ok(Self {
            storage_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn path(&self) -> &PathBuf {
        &self.storage_path
    }

    /// Write `value` to a fresh temporary file next to its final location.
    async fn stage(&self, key: &str, value: &Value) -> Result<PathBuf, StoreError> {
        let content = serde_json::to_string_pretty(value)?;
        let tmp = self
            .storage_path
            .join(format!(".{}.{}.tmp", key, Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, content).await {
            fs::remove_file(&tmp).await.ok();
            return Err(StoreError::Io(format!("Failed to write {:?}: {}", tmp, e)));
        }
        Ok(tmp)
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                message: "keys must be alphanumeric".to_string(),
            });
        }
        Ok(self.storage_path.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let mut found = HashMap::new();

        for key in keys {
            let path = self.key_path(key)?;
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StoreError::Io(format!(
                        "Failed to read {:?}: {}",
                        path, e
                    )));
                }
            };

            let value: Value = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;
            found.insert(key.to_string(), value);
        }

        Ok(found)
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        // Stage every document before replacing any.
        let mut staged: Vec<(String, PathBuf, PathBuf)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let staging = match self.key_path(&key) {
                Ok(path) => self.stage(&key, &value).await.map(|tmp| (key, tmp, path)),
                Err(e) => Err(e),
            };
            match staging {
                Ok(entry) => staged.push(entry),
                Err(e) => {
                    discard(&staged).await;
                    return Err(e);
                }
            }
        }

        for (index, (key, tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, path).await {
                discard(&staged[index..]).await;
                return Err(StoreError::Io(format!(
                    "Failed to replace {:?}: {}",
                    path, e
                )));
            }
            debug!("Stored key '{}' at {:?}", key, path);
        }

        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        for key in keys {
            let path = self.key_path(key)?;
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Removed key '{}'", key),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove {:?}: {}", path, e);
                    return Err(StoreError::Io(e.to_string()));
                }
            }
        }

        Ok(())
    }
}

async fn discard(staged: &[(String, PathBuf, PathBuf)]) {
    for (_, tmp, _) in staged {
        fs::remove_file(tmp).await.ok();
    }
}
