use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tripgraph_core::config::RunConfig;
use tripgraph_core::error::GraphError;
use tripgraph_core::llm::{LanguageModel, LlmRequest};
use tripgraph_core::messaging::{AgentMessage, MessageMetadata, MessageRole, ToolCall};
use tripgraph_core::persistence::Checkpointer;
use tripgraph_core::state::MessagesState;
use tripgraph_core::tools::{ToolContext, ToolRegistry};

use crate::graph::{
    CompileOptions, CompiledGraph, GraphStream, Node, StateGraph, StateSnapshot, StreamMode, END,
    START,
};

pub const AGENT_NODE: &str = "agent";
pub const TOOLS_NODE: &str = "tools";

/// Model/tool loop over a message history: the model answers or requests
/// tools, tool results are appended, and the model is asked again until it
/// stops requesting tools.
pub struct ReactAgent {
    name: String,
    tools: Arc<ToolRegistry>,
    recursion_limit: usize,
    graph: CompiledGraph<MessagesState>,
}

impl ReactAgent {
    pub(crate) fn new(
        name: String,
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        system_prompt: String,
        checkpointer: Option<Arc<dyn Checkpointer>>,
        recursion_limit: usize,
    ) -> Result<Self, GraphError> {
        let agent_node = AgentNode {
            agent_name: name.clone(),
            model,
            tools: tools.clone(),
            system_prompt,
        };
        let tools_node = ToolsNode {
            tools: tools.clone(),
        };

        let mut options = CompileOptions::new();
        if let Some(checkpointer) = checkpointer {
            options = options.with_checkpointer(checkpointer);
        }

        let graph = StateGraph::new(name.clone())
            .add_node(AGENT_NODE, agent_node)
            .add_node(TOOLS_NODE, tools_node)
            .add_edge(START, AGENT_NODE)
            .add_conditional_edges(AGENT_NODE, route_after_agent, [TOOLS_NODE, END])
            .add_edge(TOOLS_NODE, AGENT_NODE)
            .compile(options)?;

        Ok(Self {
            name,
            tools,
            recursion_limit,
            graph,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.names()
    }

    pub fn graph(&self) -> &CompiledGraph<MessagesState> {
        &self.graph
    }

    /// Appends `messages` to the thread (if any) and runs until the model answers.
    pub async fn invoke(
        &self,
        messages: Vec<AgentMessage>,
        config: RunConfig,
    ) -> Result<MessagesState, GraphError> {
        self.graph
            .invoke(Some(messages), self.with_limit(config))
            .await
    }

    pub fn stream(
        &self,
        messages: Option<Vec<AgentMessage>>,
        config: RunConfig,
        mode: StreamMode,
    ) -> GraphStream<'_, MessagesState> {
        self.graph.stream(messages, self.with_limit(config), mode)
    }

    pub async fn get_state(
        &self,
        config: &RunConfig,
    ) -> Result<Option<StateSnapshot<MessagesState>>, GraphError> {
        self.graph.get_state(config).await
    }

    fn with_limit(&self, config: RunConfig) -> RunConfig {
        if config.recursion_limit == tripgraph_core::config::DEFAULT_RECURSION_LIMIT {
            config.with_recursion_limit(self.recursion_limit)
        } else {
            config
        }
    }
}

fn route_after_agent(state: &MessagesState) -> String {
    match state.last_message() {
        Some(message) if message.has_tool_calls() => TOOLS_NODE.to_string(),
        _ => END.to_string(),
    }
}

struct AgentNode {
    agent_name: String,
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
}

#[async_trait]
impl Node<MessagesState> for AgentNode {
    async fn run(
        &self,
        state: MessagesState,
        _config: &RunConfig,
    ) -> anyhow::Result<Vec<AgentMessage>> {
        let request =
            LlmRequest::new(self.system_prompt.clone(), state.messages).with_tools(self.tools.schemas());
        let response = self.model.generate(request).await?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                agent = %self.agent_name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model call finished"
            );
        }
        Ok(vec![response.message.with_name(self.agent_name.clone())])
    }
}

struct ToolsNode {
    tools: Arc<ToolRegistry>,
}

impl ToolsNode {
    async fn call(&self, call: &ToolCall, config: &RunConfig) -> AgentMessage {
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool_name = %call.name, "Model requested an unknown tool");
            return AgentMessage::tool_result(
                call.id.clone(),
                call.name.clone(),
                format!(
                    "Error: {} is not a valid tool, try one of [{}].",
                    call.name,
                    self.tools.names().join(", ")
                ),
            );
        };

        let ctx = ToolContext::new()
            .with_call_id(Some(call.id.clone()))
            .with_tool_name(call.name.clone())
            .with_thread_id(config.thread_id.clone());
        tracing::debug!(tool_name = %call.name, tool_call_id = %call.id, "Executing tool");
        match tool.execute(call.args.clone(), ctx).await {
            Ok(result) => bind_to_call(result.into_message(), call),
            Err(err) => {
                tracing::warn!(tool_name = %call.name, error = %err, "Tool execution failed");
                AgentMessage::tool_result(
                    call.id.clone(),
                    call.name.clone(),
                    format!("Error: {err}\n Please fix your mistakes."),
                )
            }
        }
    }
}

/// Tool results must answer the call that produced them, whatever the tool set.
fn bind_to_call(mut message: AgentMessage, call: &ToolCall) -> AgentMessage {
    message.role = MessageRole::Tool;
    let metadata = message.metadata.get_or_insert_with(MessageMetadata::default);
    metadata.tool_call_id = Some(call.id.clone());
    if metadata.name.is_none() {
        metadata.name = Some(call.name.clone());
    }
    message
}

#[async_trait]
impl Node<MessagesState> for ToolsNode {
    async fn run(
        &self,
        state: MessagesState,
        config: &RunConfig,
    ) -> anyhow::Result<Vec<AgentMessage>> {
        let calls = match state.last_message() {
            Some(message) if message.role == MessageRole::Agent => message.tool_calls().to_vec(),
            _ => return Ok(Vec::new()),
        };
        Ok(join_all(calls.iter().map(|call| self.call(call, config))).await)
    }
}
