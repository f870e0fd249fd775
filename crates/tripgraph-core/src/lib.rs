//! Core traits and shared data models for tripgraph.
//! This crate keeps the domain primitives lightweight and platform-agnostic
//! so the runtime, toolkit and checkpoint stores can compose them without
//! pulling in HTTP or storage dependencies.

pub mod config;
pub mod error;
pub mod interrupt;
pub mod llm;
pub mod messaging;
pub mod persistence;
pub mod state;
pub mod tools;

pub use config::{RunConfig, DEFAULT_RECURSION_LIMIT};
pub use error::GraphError;
pub use interrupt::{GraphInterrupt, InterruptKind};
pub use llm::{LanguageModel, LlmRequest, LlmResponse, TokenUsage};
pub use messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole, ToolCall};
pub use persistence::{
    Checkpoint, CheckpointMetadata, CheckpointSource, Checkpointer, InMemoryCheckpointer,
    ThreadId,
};
pub use state::{GraphState, MessagesState};
pub use tools::{
    Tool, ToolBox, ToolContext, ToolParameterSchema, ToolRegistry, ToolResult, ToolSchema,
};
