//! Tools for tripgraph agents.
//!
//! - [`TavilySearchTool`]: web search backed by the Tavily API
//! - [`ToolBuilder`]: turn an async or sync closure into a [`Tool`]

pub mod builder;
pub mod search;

pub use tripgraph_core::tools::{
    Tool, ToolBox, ToolContext, ToolParameterSchema, ToolRegistry, ToolResult, ToolSchema,
};

pub use builder::{tool, tool_sync, FunctionTool, ToolBuilder};
pub use search::{SearchDepth, TavilyConfig, TavilySearchTool, TAVILY_TOOL_NAME};
