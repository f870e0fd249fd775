//! Checkpoint model and the [`Checkpointer`] trait for persisting graph state
//! between runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a conversation thread/session.
pub type ThreadId = String;

/// What produced a checkpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// Run input applied, before any node ran.
    Input,
    /// Written after a node finished.
    Loop,
    /// Manual state edit through `update_state`.
    Update,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// -1 for the first input checkpoint of a thread, then increasing.
    pub step: i64,
    /// Writes that produced this checkpoint, keyed by node name.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub writes: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// One persisted snapshot of a graph run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub id: String,
    pub thread_id: ThreadId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Serialized graph state.
    pub values: serde_json::Value,
    /// Nodes scheduled to run next; empty once the run reached END.
    #[serde(default)]
    pub next: Vec<String>,
    pub metadata: CheckpointMetadata,
}

/// Persists and retrieves checkpoints keyed by thread.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn put(&self, checkpoint: &Checkpoint) -> anyhow::Result<()>;

    /// Loads `checkpoint_id` for the thread, or the latest one when `None`.
    async fn get(
        &self,
        thread_id: &ThreadId,
        checkpoint_id: Option<&str>,
    ) -> anyhow::Result<Option<Checkpoint>>;

    /// Checkpoints of a thread, newest first.
    async fn list(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Checkpoint>>;

    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()>;

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>>;
}

/// In-memory checkpointer for testing and development.
/// State is not persisted between process restarts.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    // Oldest first per thread.
    threads: std::sync::RwLock<HashMap<ThreadId, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        let mut threads = self.threads.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory checkpointer")
        })?;
        threads
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint.clone());
        tracing::debug!(
            thread_id = %checkpoint.thread_id,
            checkpoint_id = %checkpoint.id,
            "Saved checkpoint to memory"
        );
        Ok(())
    }

    async fn get(
        &self,
        thread_id: &ThreadId,
        checkpoint_id: Option<&str>,
    ) -> anyhow::Result<Option<Checkpoint>> {
        let threads = self.threads.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        let Some(checkpoints) = threads.get(thread_id) else {
            return Ok(None);
        };
        let found = match checkpoint_id {
            Some(id) => checkpoints.iter().find(|c| c.id == id),
            None => checkpoints.last(),
        };
        Ok(found.cloned())
    }

    async fn list(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Checkpoint>> {
        let threads = self.threads.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        let checkpoints = threads
            .get(thread_id)
            .map(|list| {
                list.iter()
                    .rev()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(checkpoints)
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()> {
        let mut threads = self.threads.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory checkpointer")
        })?;
        threads.remove(thread_id);
        tracing::debug!(thread_id = %thread_id, "Deleted thread from memory");
        Ok(())
    }

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>> {
        let threads = self.threads.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        let mut ids: Vec<ThreadId> = threads.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checkpoint(thread: &str, id: &str, step: i64) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            thread_id: thread.to_string(),
            parent_id: None,
            values: json!({"step": step}),
            next: vec!["node".into()],
            metadata: CheckpointMetadata {
                source: CheckpointSource::Loop,
                step,
                writes: serde_json::Map::new(),
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn in_memory_checkpointer_returns_latest() {
        let checkpointer = InMemoryCheckpointer::new();
        let thread_id = "test-thread".to_string();
        checkpointer.put(&checkpoint(&thread_id, "a", 0)).await.unwrap();
        checkpointer.put(&checkpoint(&thread_id, "b", 1)).await.unwrap();

        let latest = checkpointer.get(&thread_id, None).await.unwrap().unwrap();
        assert_eq!(latest.id, "b");
        assert_eq!(latest.values, json!({"step": 1}));

        let first = checkpointer
            .get(&thread_id, Some("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.metadata.step, 0);
    }

    #[tokio::test]
    async fn in_memory_checkpointer_nonexistent_thread() {
        let checkpointer = InMemoryCheckpointer::new();
        let result = checkpointer
            .get(&"nonexistent".to_string(), None)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(checkpointer
            .list(&"nonexistent".to_string(), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn in_memory_checkpointer_lists_newest_first_with_limit() {
        let checkpointer = InMemoryCheckpointer::new();
        let thread_id = "t".to_string();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            checkpointer
                .put(&checkpoint(&thread_id, id, i as i64))
                .await
                .unwrap();
        }
        let listed = checkpointer.list(&thread_id, Some(2)).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn in_memory_checkpointer_delete_and_list_threads() {
        let checkpointer = InMemoryCheckpointer::new();
        checkpointer.put(&checkpoint("thread2", "x", 0)).await.unwrap();
        checkpointer.put(&checkpoint("thread1", "y", 0)).await.unwrap();

        assert_eq!(
            checkpointer.list_threads().await.unwrap(),
            vec!["thread1".to_string(), "thread2".to_string()]
        );

        checkpointer
            .delete_thread(&"thread1".to_string())
            .await
            .unwrap();
        assert!(checkpointer
            .get(&"thread1".to_string(), None)
            .await
            .unwrap()
            .is_none());
        assert_eq!(checkpointer.list_threads().await.unwrap().len(), 1);
    }

    #[test]
    fn checkpoint_round_trips_through_json() {
        let original = checkpoint("t", "id-1", 3);
        let text = serde_json::to_string(&original).unwrap();
        let decoded: Checkpoint = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, original);
    }
}
