//! Checkpointed state graphs.
//!
//! A [`StateGraph`] collects nodes and edges, [`StateGraph::compile`] validates
//! the topology and returns a [`CompiledGraph`] that can be invoked, streamed,
//! paused at interrupts and resumed from its checkpointer.

pub mod builder;
pub mod compiled;
pub mod node;
pub mod stream;

pub use builder::{CompileOptions, StateGraph};
pub use compiled::{CompiledGraph, StateSnapshot};
pub use node::{node_fn, FnNode, Node};
pub use stream::{GraphStream, StreamChunk, StreamMode};

/// Virtual node every run starts from.
pub const START: &str = "__start__";
/// Virtual node that terminates a run.
pub const END: &str = "__end__";
