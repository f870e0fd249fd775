use std::sync::Arc;

use tripgraph_core::config::DEFAULT_RECURSION_LIMIT;
use tripgraph_core::llm::LanguageModel;
use tripgraph_core::persistence::Checkpointer;
use tripgraph_core::tools::{ToolBox, ToolRegistry};

use super::runtime::ReactAgent;

/// Assembles a [`ReactAgent`] in a single fluent flow.
pub struct ReactAgentBuilder {
    name: String,
    model: Option<Arc<dyn LanguageModel>>,
    tools: Vec<ToolBox>,
    system_prompt: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    recursion_limit: usize,
}

impl ReactAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            tools: Vec::new(),
            system_prompt: None,
            checkpointer: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_tool(mut self, tool: ToolBox) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        self.tools.extend(tools);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Cap on node executions per run (each model call and each tool round counts).
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn build(self) -> anyhow::Result<ReactAgent> {
        let Self {
            name,
            model,
            tools,
            system_prompt,
            checkpointer,
            recursion_limit,
        } = self;

        let model = model.ok_or_else(|| {
            anyhow::anyhow!("ReactAgentBuilder for `{name}` requires a language model")
        })?;
        let registry: ToolRegistry = tools.into_iter().collect();

        tracing::debug!(
            agent = %name,
            tools = ?registry.names(),
            checkpointer = checkpointer.is_some(),
            "Building ReAct agent"
        );

        Ok(ReactAgent::new(
            name,
            model,
            Arc::new(registry),
            system_prompt.unwrap_or_default(),
            checkpointer,
            recursion_limit,
        )?)
    }
}
