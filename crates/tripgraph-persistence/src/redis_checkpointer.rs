//! Redis-backed checkpointer using a managed connection.
//!
//! Each thread keeps its checkpoints as JSON in a Redis list, newest at the
//! head, so `LINDEX 0` is the latest state and `LRANGE 0 n-1` the recent
//! history. A set indexes the known threads.
//!
//! ## Features
//!
//! - TTL support for automatic thread expiration (refreshed on every write)
//! - Namespace support for multi-tenant deployments

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tripgraph_core::persistence::{Checkpoint, Checkpointer, ThreadId};

/// Redis-backed checkpointer with TTL support.
///
/// ```rust,no_run
/// use tripgraph_persistence::RedisCheckpointer;
/// use std::time::Duration;
///
/// # async fn run() -> anyhow::Result<()> {
/// let checkpointer = RedisCheckpointer::builder()
///     .url("redis://127.0.0.1:6379")
///     .namespace("travel")
///     .ttl(Duration::from_secs(86400))
///     .build()
///     .await?;
/// # let _ = checkpointer;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisCheckpointer {
    connection: ConnectionManager,
    namespace: String,
    ttl: Option<Duration>,
}

impl RedisCheckpointer {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::builder().url(url).build().await
    }

    pub fn builder() -> RedisCheckpointerBuilder {
        RedisCheckpointerBuilder::default()
    }

    fn key_for_thread(&self, thread_id: &ThreadId) -> String {
        format!("{}:thread:{}:checkpoints", self.namespace, thread_id)
    }

    fn threads_index_key(&self) -> String {
        format!("{}:threads", self.namespace)
    }

    fn decode(data: &str) -> anyhow::Result<Checkpoint> {
        serde_json::from_str(data).context("Failed to deserialize checkpoint from JSON")
    }
}

#[async_trait]
impl Checkpointer for RedisCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        let key = self.key_for_thread(&checkpoint.thread_id);
        let json =
            serde_json::to_string(checkpoint).context("Failed to serialize checkpoint to JSON")?;
        let mut conn = self.connection.clone();

        conn.lpush::<_, _, ()>(&key, json)
            .await
            .context("Failed to save checkpoint to Redis")?;
        if let Some(ttl) = self.ttl {
            conn.expire::<_, ()>(&key, ttl.as_secs() as i64)
                .await
                .context("Failed to set checkpoint TTL")?;
        }
        conn.sadd::<_, _, ()>(self.threads_index_key(), &checkpoint.thread_id)
            .await
            .context("Failed to update thread index")?;

        tracing::debug!(
            thread_id = %checkpoint.thread_id,
            checkpoint_id = %checkpoint.id,
            namespace = %self.namespace,
            "Saved checkpoint to Redis"
        );
        Ok(())
    }

    async fn get(
        &self,
        thread_id: &ThreadId,
        checkpoint_id: Option<&str>,
    ) -> anyhow::Result<Option<Checkpoint>> {
        let key = self.key_for_thread(thread_id);
        let mut conn = self.connection.clone();

        let Some(checkpoint_id) = checkpoint_id else {
            let latest: Option<String> = conn
                .lindex(&key, 0)
                .await
                .context("Failed to load checkpoint from Redis")?;
            return latest.as_deref().map(Self::decode).transpose();
        };

        let all: Vec<String> = conn
            .lrange(&key, 0, -1)
            .await
            .context("Failed to load checkpoints from Redis")?;
        for data in &all {
            let checkpoint = Self::decode(data)?;
            if checkpoint.id == checkpoint_id {
                return Ok(Some(checkpoint));
            }
        }
        tracing::debug!(thread_id = %thread_id, checkpoint_id, "Checkpoint not found in Redis");
        Ok(None)
    }

    async fn list(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Checkpoint>> {
        let stop = match limit {
            Some(0) => return Ok(Vec::new()),
            Some(limit) => limit as isize - 1,
            None => -1,
        };
        let mut conn = self.connection.clone();
        let items: Vec<String> = conn
            .lrange(self.key_for_thread(thread_id), 0, stop)
            .await
            .context("Failed to list checkpoints from Redis")?;
        items.iter().map(|data| Self::decode(data)).collect()
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(self.key_for_thread(thread_id))
            .await
            .context("Failed to delete checkpoints from Redis")?;
        conn.srem::<_, _, ()>(self.threads_index_key(), thread_id)
            .await
            .context("Failed to update thread index")?;

        tracing::debug!(
            thread_id = %thread_id,
            namespace = %self.namespace,
            "Deleted thread from Redis"
        );
        Ok(())
    }

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>> {
        let mut conn = self.connection.clone();
        let mut threads: Vec<String> = conn
            .smembers(self.threads_index_key())
            .await
            .context("Failed to list threads from Redis")?;
        threads.sort();
        Ok(threads)
    }
}

#[derive(Default)]
pub struct RedisCheckpointerBuilder {
    url: Option<String>,
    namespace: Option<String>,
    ttl: Option<Duration>,
}

impl RedisCheckpointerBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Prefix for every key (default: "tripgraph").
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Threads expire this long after their last checkpoint.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub async fn build(self) -> anyhow::Result<RedisCheckpointer> {
        let url = self
            .url
            .ok_or_else(|| anyhow::anyhow!("Redis URL is required"))?;

        let client = redis::Client::open(url.as_str()).context("Failed to create Redis client")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("Failed to establish Redis connection")?;

        Ok(RedisCheckpointer {
            connection,
            namespace: self.namespace.unwrap_or_else(|| "tripgraph".to_string()),
            ttl: self.ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tripgraph_core::persistence::{CheckpointMetadata, CheckpointSource};

    fn checkpoint(thread: &str, id: &str, step: i64) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            thread_id: thread.to_string(),
            parent_id: None,
            values: json!({"messages": []}),
            next: Vec::new(),
            metadata: CheckpointMetadata {
                source: CheckpointSource::Loop,
                step,
                writes: Default::default(),
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn builder_requires_url() {
        let err = RedisCheckpointer::builder().build().await.err().unwrap();
        assert!(err.to_string().contains("Redis URL is required"));
    }

    #[tokio::test]
    #[ignore] // Requires Redis instance running
    async fn test_redis_put_get_list() {
        let saver = RedisCheckpointer::builder()
            .url("redis://127.0.0.1:6379")
            .namespace("tripgraph-test")
            .build()
            .await
            .expect("Failed to connect to Redis");
        let thread = "redis-thread".to_string();

        saver.put(&checkpoint(&thread, "cp-1", 0)).await.unwrap();
        saver.put(&checkpoint(&thread, "cp-2", 1)).await.unwrap();

        let latest = saver.get(&thread, None).await.unwrap().unwrap();
        assert_eq!(latest.id, "cp-2");
        let first = saver.get(&thread, Some("cp-1")).await.unwrap().unwrap();
        assert_eq!(first.metadata.step, 0);
        assert_eq!(saver.list(&thread, Some(1)).await.unwrap().len(), 1);
        assert!(saver.list_threads().await.unwrap().contains(&thread));

        saver.delete_thread(&thread).await.unwrap();
        assert!(saver.get(&thread, None).await.unwrap().is_none());
    }
}
