//! Store-backed queue operations.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use followloop_protocols::{StoreError, UserRecord};
use followloop_store::AgentStore;

use crate::model;

/// Queue and history operations applied against the shared store.
///
/// Each call reads the current lists, applies one pure operation and writes
/// the result back.
#[derive(Clone)]
pub struct TaskQueue {
    store: AgentStore,
}

impl TaskQueue {
    pub fn new(store: AgentStore) -> Self {
        Self { store }
    }

    /// Insert records not yet seen in queue or history. Returns the count inserted.
    pub async fn enqueue_if_new(&self, records: Vec<UserRecord>) -> Result<usize, StoreError> {
        let mut queue = self.store.queue().await?;
        let history = self.store.history().await?;

        let offered = records.len();
        let inserted = model::enqueue_if_new(&mut queue, &history, records);
        if inserted > 0 {
            self.store.save_queue(&queue).await?;
        }

        info!(
            "Enqueued {} of {} offered records (queue size {})",
            inserted,
            offered,
            queue.len()
        );
        Ok(inserted)
    }

    /// Move `username` into history as followed at `now`.
    pub async fn mark_followed(&self, username: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut queue = self.store.queue().await?;
        let mut history = self.store.history().await?;
        model::mark_followed(&mut queue, &mut history, username, now);
        self.store.save_lists(&queue, &history).await?;
        debug!("Marked @{} followed", username);
        Ok(())
    }

    /// Set `unfollowed_at` on the history record of `username`.
    pub async fn mark_unfollowed(&self, username: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut history = self.store.history().await?;
        let changed = model::mark_unfollowed(&mut history, username, now);
        if changed {
            self.store.save_history(&history).await?;
            debug!("Marked @{} unfollowed", username);
        }
        Ok(changed)
    }

    /// Drop `username` from the queue.
    pub async fn remove(&self, username: &str) -> Result<bool, StoreError> {
        let mut queue = self.store.queue().await?;
        let removed = model::remove_queued(&mut queue, username);
        if removed {
            self.store.save_queue(&queue).await?;
            debug!("Removed @{} from queue", username);
        }
        Ok(removed)
    }

    /// Empty the queue. Returns how many records were dropped.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let queue = self.store.queue().await?;
        self.store.save_queue(&[]).await?;
        info!("Cleared {} queued records", queue.len());
        Ok(queue.len())
    }

    pub async fn next_follow_candidate(&self) -> Result<Option<UserRecord>, StoreError> {
        let queue = self.store.queue().await?;
        let history = self.store.history().await?;
        Ok(model::next_follow_candidate(&queue, &history).cloned())
    }

    pub async fn next_unfollow_candidate(
        &self,
        threshold_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, StoreError> {
        let history = self.store.history().await?;
        Ok(model::next_unfollow_candidate(&history, threshold_secs, now).cloned())
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.store.queue().await
    }

    pub async fn history(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.store.history().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use async_trait::async_trait;
    use followloop_protocols::{KeyValueStore, RecordStatus, keys};
    use followloop_store::MemoryStore;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn queue() -> TaskQueue {
        TaskQueue::new(AgentStore::new(Arc::new(MemoryStore::new())))
    }

    /// Memory store that refuses writes to the queue key.
    struct QueueWriteFails(MemoryStore);

    #[async_trait]
    impl KeyValueStore for QueueWriteFails {
        async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
            self.0.get(keys).await
        }

        async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError> {
            if entries.contains_key(keys::QUEUE) {
                return Err(StoreError::Io("disk full".to_string()));
            }
            self.0.set(entries).await
        }

        async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
            self.0.remove(keys).await
        }
    }

    #[tokio::test]
    async fn test_alice_follow_scenario() {
        let queue = queue();
        queue
            .enqueue_if_new(vec![UserRecord::new("alice")])
            .await
            .unwrap();

        let candidate = queue.next_follow_candidate().await.unwrap();
        assert_eq!(candidate.map(|r| r.username), Some("alice".to_string()));

        let now = Utc::now();
        queue.mark_followed("alice", now).await.unwrap();

        assert!(queue.list().await.unwrap().is_empty());
        let history = queue.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].username, "alice");
        assert_eq!(history[0].followed_at, Some(now));
    }

    #[tokio::test]
    async fn test_failed_queue_write_keeps_history() {
        let seeded = MemoryStore::new();
        seeded
            .set(HashMap::from([(
                keys::QUEUE.to_string(),
                serde_json::to_value(vec![UserRecord::new("alice")]).unwrap(),
            )]))
            .await
            .unwrap();
        let queue = TaskQueue::new(AgentStore::new(Arc::new(QueueWriteFails(seeded))));

        assert!(queue.mark_followed("alice", Utc::now()).await.is_err());

        let history = queue.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].username, "alice");
        // Still queued, but no longer a candidate.
        assert_eq!(queue.list().await.unwrap().len(), 1);
        assert_eq!(queue.next_follow_candidate().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bob_unfollow_scenario() {
        let queue = queue();
        let followed_at = Utc::now() - Duration::seconds(61);
        queue.mark_followed("bob", followed_at).await.unwrap();

        let now = followed_at + Duration::seconds(61);
        let candidate = queue.next_unfollow_candidate(Some(60), now).await.unwrap();
        assert_eq!(candidate.map(|r| r.username), Some("bob".to_string()));

        assert!(queue.mark_unfollowed("bob", now).await.unwrap());
        let history = queue.history().await.unwrap();
        assert_eq!(history[0].unfollowed_at, Some(now));
        assert_eq!(history[0].status(), RecordStatus::Unfollowed);
    }

    #[tokio::test]
    async fn test_enqueue_twice_same_queue() {
        let queue = queue();
        let batch = vec![UserRecord::new("a"), UserRecord::new("b")];
        assert_eq!(queue.enqueue_if_new(batch.clone()).await.unwrap(), 2);
        assert_eq!(queue.enqueue_if_new(batch).await.unwrap(), 0);
        assert_eq!(queue.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let queue = queue();
        queue
            .enqueue_if_new(vec![UserRecord::new("a"), UserRecord::new("b")])
            .await
            .unwrap();
        assert!(queue.remove("a").await.unwrap());
        assert!(!queue.remove("a").await.unwrap());
        assert_eq!(queue.clear().await.unwrap(), 1);
        assert!(queue.list().await.unwrap().is_empty());
    }
}
