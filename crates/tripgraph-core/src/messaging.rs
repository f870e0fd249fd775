use serde::{Deserialize, Serialize};

/// Core message structure exchanged between models, agents, and tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub role: MessageRole,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
    Tool,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum MessageContent {
    Text(String),
    Json(serde_json::Value),
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            MessageContent::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A tool request emitted by the model inside an agent message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageMetadata {
    /// Set on tool messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on agent messages that request tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Agent name for agent messages, tool name for tool messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AgentMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(MessageRole::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::text(MessageRole::Agent, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(MessageRole::System, text)
    }

    fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
            metadata: None,
        }
    }

    /// Agent message that asks the runtime to execute tools.
    pub fn agent_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Agent,
            content: MessageContent::Text(text.into()),
            metadata: Some(MessageMetadata {
                tool_calls,
                ..MessageMetadata::default()
            }),
        }
    }

    /// Tool message answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Text(text.into()),
            metadata: Some(MessageMetadata {
                tool_call_id: Some(tool_call_id.into()),
                name: Some(tool_name.into()),
                ..MessageMetadata::default()
            }),
        }
    }

    /// Renders the content as plain text; JSON content is rendered compactly.
    pub fn text_content(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Json(value) => value.to_string(),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.metadata
            .as_ref()
            .map(|meta| meta.tool_calls.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.tool_call_id.as_deref())
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|meta| meta.name.as_deref())
    }

    /// Sets the `name` metadata field, creating metadata when absent.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(MessageMetadata::default).name = Some(name.into());
        self
    }
}
