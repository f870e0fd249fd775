use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tripgraph_core::tools::{Tool, ToolContext, ToolParameterSchema, ToolResult, ToolSchema};

pub const TAVILY_TOOL_NAME: &str = "tavily_search_results_json";
const DEFAULT_API_URL: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Clone)]
pub struct TavilyConfig {
    pub api_key: String,
    pub max_results: u8,
    pub search_depth: SearchDepth,
    pub include_answer: bool,
    pub api_url: Option<String>,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            max_results: DEFAULT_MAX_RESULTS,
            search_depth: SearchDepth::default(),
            include_answer: false,
            api_url: None,
        }
    }

    pub fn with_max_results(mut self, max_results: u8) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_include_answer(mut self, include_answer: bool) -> Self {
        self.include_answer = include_answer;
        self
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.api_url = api_url;
        self
    }
}

impl std::fmt::Debug for TavilyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyConfig")
            .field("max_results", &self.max_results)
            .field("search_depth", &self.search_depth)
            .field("include_answer", &self.include_answer)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Web search through Tavily. The model sees a JSON array of
/// `{title, url, content, score}`; the raw API response rides along as the
/// result artifact.
pub struct TavilySearchTool {
    client: Client,
    config: TavilyConfig,
}

impl TavilySearchTool {
    pub fn new(config: TavilyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().user_agent("tripgraph/0.1").build()?,
            config,
        })
    }

    pub fn config(&self) -> &TavilyConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct TavilyArgs {
    query: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u8,
    search_depth: SearchDepth,
    include_answer: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = BTreeMap::new();
        properties.insert(
            "query".to_string(),
            ToolParameterSchema::string("search query to look up"),
        );
        ToolSchema::new(
            TAVILY_TOOL_NAME,
            "A search engine optimized for comprehensive, accurate, and trusted results. \
             Useful for when you need to answer questions about current events. \
             Input should be a search query.",
            ToolParameterSchema::object("Search input", properties, vec!["query".to_string()]),
        )
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        let args: TavilyArgs = serde_json::from_value(args)
            .map_err(|err| anyhow::anyhow!("invalid arguments for {TAVILY_TOOL_NAME}: {err}"))?;
        let url = self.config.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let body = TavilyRequest {
            api_key: &self.config.api_key,
            query: &args.query,
            max_results: self.config.max_results,
            search_depth: self.config.search_depth,
            include_answer: self.config.include_answer,
        };

        tracing::info!(tool_name = TAVILY_TOOL_NAME, query = %args.query, "Calling Tavily");
        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Tavily API error: {} - {}",
                status,
                error_text
            ));
        }

        let raw: Value = response.json().await?;
        let parsed: TavilyResponse = serde_json::from_value(raw.clone())?;
        tracing::debug!(results = parsed.results.len(), "Tavily search finished");

        let message = ctx.text_response(serde_json::to_string(&parsed.results)?);
        Ok(ToolResult::with_artifact(message, raw))
    }
}
