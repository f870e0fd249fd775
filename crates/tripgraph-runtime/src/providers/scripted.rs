//! A language model that replays canned replies, for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use tripgraph_core::llm::{LanguageModel, LlmRequest, LlmResponse};
use tripgraph_core::messaging::AgentMessage;

/// Returns queued messages in order and records every request it receives.
///
/// Once the queue is empty every call fails, which surfaces runaway loops in
/// tests instead of hanging them.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<AgentMessage>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = AgentMessage>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: AgentMessage) -> anyhow::Result<()> {
        self.replies
            .lock()
            .map_err(|_| anyhow!("Failed to acquire scripted replies lock"))?
            .push_back(reply);
        Ok(())
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("Failed to acquire scripted requests lock"))?
            .push(request);
        let reply = self
            .replies
            .lock()
            .map_err(|_| anyhow!("Failed to acquire scripted replies lock"))?
            .pop_front()
            .ok_or_else(|| anyhow!("ScriptedModel has no replies left"))?;
        Ok(LlmResponse::new(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let model = ScriptedModel::new([AgentMessage::agent("one"), AgentMessage::agent("two")]);
        let request = LlmRequest::new("sys", vec![AgentMessage::user("hi")]);

        let first = model.generate(request.clone()).await.unwrap();
        let second = model.generate(request.clone()).await.unwrap();
        assert_eq!(first.message.text_content(), "one");
        assert_eq!(second.message.text_content(), "two");
        assert!(model.generate(request).await.is_err());
        assert_eq!(model.requests().len(), 3);
        assert_eq!(model.requests()[0].system_prompt, "sys");
    }

    #[tokio::test]
    async fn push_extends_queue() {
        let model = ScriptedModel::default();
        model.push(AgentMessage::agent("late")).unwrap();
        assert_eq!(model.remaining(), 1);
        let reply = model
            .generate(LlmRequest::new("", Vec::new()))
            .await
            .unwrap();
        assert_eq!(reply.message.text_content(), "late");
        assert_eq!(model.remaining(), 0);
    }
}
