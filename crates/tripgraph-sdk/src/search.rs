//! The conversational search agent.

use std::sync::Arc;

use tripgraph_core::config::RunConfig;
use tripgraph_core::llm::LanguageModel;
use tripgraph_core::messaging::AgentMessage;
use tripgraph_core::persistence::Checkpointer;
use tripgraph_core::state::MessagesState;
use tripgraph_core::tools::ToolBox;
use tripgraph_runtime::{ReactAgent, ReactAgentBuilder};

/// Name the search agent signs its replies with.
pub const SEARCH_AGENT_NAME: &str = "searchAgent";
/// Thread used when none is given.
pub const DEFAULT_THREAD_ID: &str = "123-abc";
/// Opening question of the demo conversation.
pub const FIRST_QUESTION: &str = "Hi, who is Tom Cruise?";
/// Follow-up that only makes sense with thread memory.
pub const FOLLOW_UP_QUESTION: &str = "did i ask about Tom?";

/// ReAct agent named [`SEARCH_AGENT_NAME`] over `tools`.
///
/// With a checkpointer, invocations sharing a thread id continue the same
/// conversation.
pub fn build_search_agent(
    model: Arc<dyn LanguageModel>,
    tools: Vec<ToolBox>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
) -> anyhow::Result<ReactAgent> {
    let mut builder = ReactAgentBuilder::new(SEARCH_AGENT_NAME)
        .with_model(model)
        .with_tools(tools);
    if let Some(checkpointer) = checkpointer {
        builder = builder.with_checkpointer(checkpointer);
    }
    builder.build()
}

/// Asks each question in turn on `thread_id` and returns the state after each.
pub async fn ask_in_thread<I, Q>(
    agent: &ReactAgent,
    thread_id: &str,
    questions: I,
) -> anyhow::Result<Vec<MessagesState>>
where
    I: IntoIterator<Item = Q>,
    Q: Into<String>,
{
    let mut results = Vec::new();
    for question in questions {
        let question = question.into();
        tracing::info!(thread_id = %thread_id, question = %question, "Asking search agent");
        let state = agent
            .invoke(
                vec![AgentMessage::user(question)],
                RunConfig::for_thread(thread_id),
            )
            .await?;
        results.push(state);
    }
    Ok(results)
}
