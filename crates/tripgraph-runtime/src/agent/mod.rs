//! Prebuilt ReAct agent.
//!
//! - `api`: default model resolution and the `create_react_agent` shortcut
//! - `builder`: fluent construction of a [`ReactAgent`]
//! - `runtime`: the agent itself plus its `agent` and `tools` graph nodes

pub mod api;
pub mod builder;
pub mod runtime;

pub use api::{create_react_agent, get_default_model};
pub use builder::ReactAgentBuilder;
pub use runtime::{ReactAgent, AGENT_NODE, TOOLS_NODE};
