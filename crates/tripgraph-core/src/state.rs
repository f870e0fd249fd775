use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::messaging::AgentMessage;

/// State threaded through a state graph.
///
/// Nodes never return a whole state; they return an [`GraphState::Update`]
/// which the executor merges with [`GraphState::apply`]. Fields an update does
/// not mention must stay untouched.
pub trait GraphState:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Update: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    fn apply(&mut self, update: Self::Update);
}

/// Conversation state used by the prebuilt agent: an append-only message list.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagesState {
    pub messages: Vec<AgentMessage>,
}

impl MessagesState {
    pub fn last_message(&self) -> Option<&AgentMessage> {
        self.messages.last()
    }
}

impl GraphState for MessagesState {
    type Update = Vec<AgentMessage>;

    fn apply(&mut self, update: Self::Update) {
        self.messages.extend(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_update_appends() {
        let mut state = MessagesState {
            messages: vec![AgentMessage::user("one")],
        };
        state.apply(vec![AgentMessage::agent("two"), AgentMessage::user("three")]);
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.last_message().unwrap().text_content(), "three");
    }
}
