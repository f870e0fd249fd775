use std::sync::Arc;

use tripgraph_core::llm::LanguageModel;
use tripgraph_core::persistence::Checkpointer;
use tripgraph_core::tools::ToolBox;

use super::builder::ReactAgentBuilder;
use super::runtime::ReactAgent;
use crate::providers::{OpenAiChatModel, OpenAiConfig};

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI `gpt-4o` at temperature 0, keyed by `OPENAI_API_KEY`.
pub fn get_default_model() -> anyhow::Result<Arc<dyn LanguageModel>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable is required"))?;
    let model: Arc<dyn LanguageModel> =
        Arc::new(OpenAiChatModel::new(OpenAiConfig::new(api_key, DEFAULT_MODEL))?);
    Ok(model)
}

/// Shortcut for the common case: a named agent with tools and an optional
/// checkpointer, falling back to [`get_default_model`] when `model` is `None`.
pub fn create_react_agent(
    name: impl Into<String>,
    model: Option<Arc<dyn LanguageModel>>,
    tools: Vec<ToolBox>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
) -> anyhow::Result<ReactAgent> {
    let model = match model {
        Some(model) => model,
        None => get_default_model()?,
    };
    let mut builder = ReactAgentBuilder::new(name)
        .with_model(model)
        .with_tools(tools);
    if let Some(checkpointer) = checkpointer {
        builder = builder.with_checkpointer(checkpointer);
    }
    builder.build()
}
