use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tripgraph_core::llm::{LanguageModel, LlmRequest, LlmResponse, TokenUsage};
use tripgraph_core::messaging::{AgentMessage, MessageMetadata, MessageRole, ToolCall};
use tripgraph_core::tools::ToolSchema;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub api_url: Option<String>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            temperature: Some(0.0),
            api_url: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.api_url = api_url;
        self
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

pub struct OpenAiChatModel {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().user_agent("tripgraph/0.1").build()?,
            config,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [OpenAiMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool>,
}

#[derive(Debug, Serialize, PartialEq)]
struct OpenAiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OpenAiFunctionCall {
    name: String,
    /// JSON-encoded arguments, as the API transmits them.
    arguments: String,
}

#[derive(Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAiFunction,
}

#[derive(Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn to_openai_messages(request: &LlmRequest) -> Vec<OpenAiMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system_prompt.is_empty() {
        messages.push(OpenAiMessage {
            role: "system",
            content: Some(request.system_prompt.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });
    }

    for msg in &request.messages {
        let content = msg.text_content();
        let converted = match msg.role {
            MessageRole::User => OpenAiMessage {
                role: "user",
                content: Some(content),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
            MessageRole::System => OpenAiMessage {
                role: "system",
                content: Some(content),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
            MessageRole::Agent => {
                let tool_calls: Vec<OpenAiToolCall> = msg
                    .tool_calls()
                    .iter()
                    .map(|call| OpenAiToolCall {
                        id: call.id.clone(),
                        kind: function_kind(),
                        function: OpenAiFunctionCall {
                            name: call.name.clone(),
                            arguments: call.args.to_string(),
                        },
                    })
                    .collect();
                // The API rejects empty assistant content alongside tool calls.
                let content = if content.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(content)
                };
                OpenAiMessage {
                    role: "assistant",
                    content,
                    tool_calls,
                    tool_call_id: None,
                }
            }
            MessageRole::Tool => {
                let Some(call_id) = msg.tool_call_id() else {
                    tracing::warn!("Skipping tool message without tool_call_id");
                    continue;
                };
                OpenAiMessage {
                    role: "tool",
                    content: Some(content),
                    tool_calls: Vec::new(),
                    tool_call_id: Some(call_id.to_string()),
                }
            }
        };
        messages.push(converted);
    }
    messages
}

fn to_openai_tools(tools: &[ToolSchema]) -> Vec<OpenAiTool> {
    tools
        .iter()
        .map(|tool| OpenAiTool {
            kind: "function",
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: serde_json::to_value(&tool.parameters)
                    .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
            },
        })
        .collect()
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Model produced tool arguments that are not valid JSON");
        Value::String(raw.to_string())
    })
}

fn from_choice(message: ChoiceMessage) -> AgentMessage {
    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall {
            args: parse_arguments(&call.function.arguments),
            id: call.id,
            name: call.function.name,
        })
        .collect();
    let text = message.content.unwrap_or_default();
    if tool_calls.is_empty() {
        AgentMessage::agent(text)
    } else {
        let mut msg = AgentMessage::agent(text);
        msg.metadata = Some(MessageMetadata {
            tool_calls,
            ..MessageMetadata::default()
        });
        msg
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        let messages = to_openai_messages(&request);
        let body = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            tools: to_openai_tools(&request.tools),
        };
        let url = self.config.api_url.as_deref().unwrap_or(DEFAULT_API_URL);

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = body.tools.len(),
            "OpenAI request"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_text, "OpenAI API error");
            return Err(anyhow::anyhow!(
                "OpenAI API error: {} - {}",
                status,
                error_text
            ));
        }

        let data: ChatResponse = response.json().await?;
        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        if let Some(usage) = usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI usage"
            );
        }

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("OpenAI response missing choices"))?;

        Ok(LlmResponse {
            message: from_choice(choice.message),
            usage,
        })
    }
}
