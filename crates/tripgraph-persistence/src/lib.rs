//! Checkpoint stores that outlive the process.
//!
//! ## Available Backends
//!
//! - **Convo**: hosted checkpoint service reached over REST ([`ConvoClient`])
//! - **Redis**: self-hosted store with optional TTL (feature `redis`)
//!
//! The in-memory store lives in `tripgraph-core` as
//! [`InMemoryCheckpointer`](tripgraph_core::persistence::InMemoryCheckpointer).
//!
//! ```rust,no_run
//! use tripgraph_persistence::{ConvoClient, ConvoConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let convo = ConvoClient::new(ConvoConfig::new("convo-key", "https://convo.example.com/v1"))?;
//! let thread_id = convo.new_thread().await?;
//! let checkpointer = convo.checkpointer();
//! # let _ = (thread_id, checkpointer);
//! # Ok(())
//! # }
//! ```

pub mod convo;

#[cfg(feature = "redis")]
pub mod redis_checkpointer;

pub use convo::{ConvoCheckpointer, ConvoClient, ConvoConfig};

#[cfg(feature = "redis")]
pub use redis_checkpointer::{RedisCheckpointer, RedisCheckpointerBuilder};

pub use tripgraph_core::persistence::{Checkpoint, Checkpointer, ThreadId};
