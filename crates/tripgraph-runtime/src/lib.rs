//! Runtime for tripgraph: LLM providers, the checkpointed state-graph
//! executor and the prebuilt ReAct agent built on top of it.

pub mod agent;
pub mod graph;
pub mod providers;

pub use agent::{create_react_agent, get_default_model, ReactAgent, ReactAgentBuilder};
pub use graph::{
    node_fn, CompileOptions, CompiledGraph, GraphStream, Node, StateGraph, StateSnapshot,
    StreamChunk, StreamMode, END, START,
};
pub use providers::{OpenAiChatModel, OpenAiConfig, ScriptedModel};
