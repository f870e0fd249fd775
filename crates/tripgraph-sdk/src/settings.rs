//! Environment-driven configuration shared by the programs.

use std::sync::Arc;

use anyhow::Context;
use tripgraph_core::llm::LanguageModel;
use tripgraph_core::tools::ToolBox;
use tripgraph_persistence::ConvoConfig;
use tripgraph_runtime::{OpenAiChatModel, OpenAiConfig};
use tripgraph_toolkit::{TavilyConfig, TavilySearchTool};

/// Model used when `OPENAI_MODEL` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
/// Search results requested per query when `TAVILY_MAX_RESULTS` is unset.
pub const DEFAULT_TAVILY_MAX_RESULTS: u8 = 4;

/// Credentials and model choices read from the environment.
///
/// | variable             | required | default  |
/// |----------------------|----------|----------|
/// | `OPENAI_API_KEY`     | yes      |          |
/// | `OPENAI_MODEL`       | no       | `gpt-4o` |
/// | `OPENAI_API_URL`     | no       | OpenAI chat completions endpoint |
/// | `TAVILY_API_KEY`     | yes      |          |
/// | `TAVILY_MAX_RESULTS` | no       | `4`      |
/// | `CONVO_API_KEY`      | for the Convo backend | |
/// | `CONVO_API_URL`      | for the Convo backend | |
#[derive(Clone)]
pub struct Settings {
    /// Chat model configuration (temperature 0).
    pub openai: OpenAiConfig,
    /// Web search configuration.
    pub tavily: TavilyConfig,
    /// Convo API key, if configured.
    pub convo_api_key: Option<String>,
    /// Convo base URL, if configured.
    pub convo_api_url: Option<String>,
}

impl Settings {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| anyhow::anyhow!("{name} environment variable is required"))
        };

        let openai = OpenAiConfig::new(
            require("OPENAI_API_KEY")?,
            get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        )
        .with_api_url(get("OPENAI_API_URL"));

        let max_results = match get("TAVILY_MAX_RESULTS") {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .with_context(|| format!("TAVILY_MAX_RESULTS must be a number, got `{raw}`"))?,
            None => DEFAULT_TAVILY_MAX_RESULTS,
        };
        let tavily = TavilyConfig::new(require("TAVILY_API_KEY")?).with_max_results(max_results);

        Ok(Self {
            openai,
            tavily,
            convo_api_key: get("CONVO_API_KEY"),
            convo_api_url: get("CONVO_API_URL"),
        })
    }

    /// The configured OpenAI chat model.
    pub fn chat_model(&self) -> anyhow::Result<Arc<dyn LanguageModel>> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiChatModel::new(self.openai.clone())?);
        Ok(model)
    }

    /// The Tavily web search tool.
    pub fn search_tool(&self) -> anyhow::Result<ToolBox> {
        let tool: ToolBox = Arc::new(TavilySearchTool::new(self.tavily.clone())?);
        Ok(tool)
    }

    /// Convo credentials; errors name whichever variable is missing.
    pub fn convo_config(&self) -> anyhow::Result<ConvoConfig> {
        let api_key = self
            .convo_api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CONVO_API_KEY is required for the convo backend"))?;
        let api_url = self
            .convo_api_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CONVO_API_URL is required for the convo backend"))?;
        Ok(ConvoConfig::new(api_key, api_url))
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openai", &self.openai)
            .field("tavily", &self.tavily)
            .field("convo_api_url", &self.convo_api_url)
            .finish_non_exhaustive()
    }
}
