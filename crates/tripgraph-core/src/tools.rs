//! Schema-driven tool system.
//!
//! Tools describe their parameters with a JSON Schema subset so providers can
//! advertise them to the model, and are executed by the agent runtime with a
//! [`ToolContext`] that ties the response back to the originating call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole};
use crate::persistence::ThreadId;

/// JSON Schema definition for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameterSchema {
    /// JSON Schema type (object, string, number, boolean, array, null)
    #[serde(rename = "type")]
    pub schema_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Properties for object types (nested schemas)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ToolParameterSchema>>,

    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ToolParameterSchema>>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Additional schema properties (min, max, pattern, etc.)
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl ToolParameterSchema {
    fn scalar(schema_type: &str, description: impl Into<String>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            description: Some(description.into()),
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            default: None,
            additional: HashMap::new(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::scalar("string", description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::scalar("number", description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::scalar("integer", description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::scalar("boolean", description)
    }

    /// Create an object parameter with properties
    pub fn object(
        description: impl Into<String>,
        properties: BTreeMap<String, ToolParameterSchema>,
        required: Vec<String>,
    ) -> Self {
        Self {
            properties: Some(properties),
            required: Some(required),
            ..Self::scalar("object", description)
        }
    }

    pub fn array(description: impl Into<String>, items: ToolParameterSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::scalar("array", description)
        }
    }

    /// Restrict the accepted values.
    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Complete schema definition for a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// Unique, stable name for this tool (used by LLM for invocation)
    pub name: String,

    pub description: String,

    /// Input parameter schema (typically an object with properties)
    pub parameters: ToolParameterSchema,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Create a tool schema with no parameters
    pub fn no_params(name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut parameters = ToolParameterSchema::object("", BTreeMap::new(), Vec::new());
        parameters.description = None;
        Self::new(name, description, parameters)
    }
}

/// Context provided to tool implementations.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Call id from the model's tool request, echoed on the response message.
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    /// Thread the invoking run belongs to, when it has one.
    pub thread_id: Option<ThreadId>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call_id(mut self, call_id: Option<String>) -> Self {
        self.tool_call_id = call_id;
        self
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn with_thread_id(mut self, thread_id: Option<ThreadId>) -> Self {
        self.thread_id = thread_id;
        self
    }

    fn metadata(&self) -> Option<MessageMetadata> {
        if self.tool_call_id.is_none() && self.tool_name.is_none() {
            return None;
        }
        Some(MessageMetadata {
            tool_call_id: self.tool_call_id.clone(),
            name: self.tool_name.clone(),
            ..MessageMetadata::default()
        })
    }

    /// Create a tool response message with proper metadata
    pub fn text_response(&self, content: impl Into<String>) -> AgentMessage {
        AgentMessage {
            role: MessageRole::Tool,
            content: MessageContent::Text(content.into()),
            metadata: self.metadata(),
        }
    }

    pub fn json_response(&self, content: Value) -> AgentMessage {
        AgentMessage {
            role: MessageRole::Tool,
            content: MessageContent::Json(content),
            metadata: self.metadata(),
        }
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone)]
pub enum ToolResult {
    Message(AgentMessage),

    /// Message for the model plus a raw payload kept for the caller only.
    WithArtifact {
        message: AgentMessage,
        artifact: Value,
    },
}

impl ToolResult {
    pub fn text(ctx: &ToolContext, content: impl Into<String>) -> Self {
        Self::Message(ctx.text_response(content))
    }

    pub fn json(ctx: &ToolContext, content: Value) -> Self {
        Self::Message(ctx.json_response(content))
    }

    pub fn with_artifact(message: AgentMessage, artifact: Value) -> Self {
        Self::WithArtifact { message, artifact }
    }

    pub fn message(&self) -> &AgentMessage {
        match self {
            Self::Message(message) | Self::WithArtifact { message, .. } => message,
        }
    }

    pub fn into_message(self) -> AgentMessage {
        match self {
            Self::Message(message) | Self::WithArtifact { message, .. } => message,
        }
    }

    pub fn artifact(&self) -> Option<&Value> {
        match self {
            Self::WithArtifact { artifact, .. } => Some(artifact),
            Self::Message(_) => None,
        }
    }
}

/// Core trait for tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult>;
}

pub type ToolBox = Arc<dyn Tool>;

/// Tool registry for managing and discovering available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolBox>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: ToolBox) -> &mut Self {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replacing previously registered tool");
        }
        self
    }

    pub fn register_all<I>(&mut self, tools: I) -> &mut Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        for tool in tools {
            self.register(tool);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolBox> {
        self.tools.get(name)
    }

    /// Schemas sorted by tool name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Names sorted alphabetically.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<ToolBox> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = ToolBox>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.register_all(iter);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn schema(&self) -> ToolSchema {
            ToolSchema::no_params(self.0, "test tool")
        }

        async fn execute(&self, _args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::text(&ctx, self.0))
        }
    }

    #[test]
    fn object_schema_serializes_as_json_schema() {
        let mut props = BTreeMap::new();
        props.insert("query".to_string(), ToolParameterSchema::string("Search query"));
        let schema = ToolParameterSchema::object("Args", props, vec!["query".into()]);
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "object",
                "description": "Args",
                "properties": {"query": {"type": "string", "description": "Search query"}},
                "required": ["query"]
            })
        );
    }

    #[test]
    fn no_params_schema_is_empty_object() {
        let schema = ToolSchema::no_params("ping", "Ping");
        assert_eq!(
            serde_json::to_value(&schema.parameters).unwrap(),
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn registry_lists_names_sorted() {
        let registry: ToolRegistry = vec![
            Arc::new(Named("zeta")) as ToolBox,
            Arc::new(Named("alpha")) as ToolBox,
        ]
        .into_iter()
        .collect();
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert_eq!(registry.schemas()[0].name, "alpha");
        assert!(registry.has("zeta"));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn context_ties_response_to_call() {
        let ctx = ToolContext::new()
            .with_call_id(Some("call-3".into()))
            .with_tool_name("alpha");
        let result = Named("alpha").execute(json!({}), ctx).await.unwrap();
        let message = result.into_message();
        assert_eq!(message.tool_call_id(), Some("call-3"));
        assert_eq!(message.name(), Some("alpha"));
        assert_eq!(message.text_content(), "alpha");
    }

    #[test]
    fn artifact_is_kept_apart_from_message() {
        let ctx = ToolContext::new();
        let result = ToolResult::with_artifact(ctx.text_response("short"), json!({"raw": true}));
        assert_eq!(result.message().text_content(), "short");
        assert_eq!(result.artifact(), Some(&json!({"raw": true})));
    }
}
