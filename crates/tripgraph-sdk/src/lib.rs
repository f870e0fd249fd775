//! # tripgraph
//!
//! Checkpointed state graphs and ReAct agents for Rust, plus two ready-made
//! workflows: a conversational search agent and a travel planner that pauses
//! for the traveller's choice.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripgraph_sdk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let agent = build_search_agent(
//!         settings.chat_model()?,
//!         vec![settings.search_tool()?],
//!         Some(Arc::new(InMemoryCheckpointer::new())),
//!     )?;
//!     let answers = ask_in_thread(&agent, "123-abc", ["Hi, who is Tom Cruise?"]).await?;
//!     println!("{:?}", answers[0].last_message());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `redis`: enables the Redis checkpoint store

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod search;
pub mod settings;
pub mod travel;

pub use tripgraph_core::{config, error, interrupt, llm, messaging, persistence, state, tools};
pub use tripgraph_runtime::{agent, graph, providers};

pub use search::{ask_in_thread, build_search_agent};
pub use settings::Settings;
pub use travel::{build_travel_graph, record_selection, TravelOptions, TripState, TripUpdate};

/// Checkpoint stores beyond the in-memory one.
pub mod stores {
    pub use tripgraph_persistence::{ConvoCheckpointer, ConvoClient, ConvoConfig};

    #[cfg(feature = "redis")]
    #[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
    pub use tripgraph_persistence::{RedisCheckpointer, RedisCheckpointerBuilder};
}

/// Search and closure-backed tools.
pub mod toolkit {
    pub use tripgraph_toolkit::*;
}

/// Everything the programs need in one import.
pub mod prelude {
    pub use crate::search::{ask_in_thread, build_search_agent};
    pub use crate::settings::Settings;
    pub use crate::stores::{ConvoClient, ConvoConfig};
    pub use crate::travel::{
        build_travel_graph, record_selection, TravelOptions, TripState, TripUpdate,
    };
    pub use tripgraph_core::{
        AgentMessage, Checkpointer, GraphInterrupt, InMemoryCheckpointer, MessageRole,
        MessagesState, RunConfig, ToolBox,
    };
    pub use tripgraph_runtime::{
        CompiledGraph, ReactAgent, ReactAgentBuilder, StreamChunk, StreamMode,
    };
}
