//! Closure-backed tools.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tripgraph_core::tools::{Tool, ToolBox, ToolContext, ToolParameterSchema, ToolResult, ToolSchema};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type AsyncToolFn =
    Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, anyhow::Result<ToolResult>> + Send + Sync>;

/// A [`Tool`] whose behaviour is a closure.
pub struct FunctionTool {
    schema: ToolSchema,
    handler: AsyncToolFn,
}

impl FunctionTool {
    pub fn new(schema: ToolSchema, handler: AsyncToolFn) -> Self {
        Self { schema, handler }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        (self.handler)(args, ctx).await
    }
}

/// Builds a [`FunctionTool`], either from a full parameter schema or one
/// parameter at a time.
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Option<ToolParameterSchema>,
    properties: BTreeMap<String, ToolParameterSchema>,
    required: Vec<String>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Replaces the whole parameter schema; individual `with_param` calls are ignored.
    pub fn with_parameters(mut self, parameters: ToolParameterSchema) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        schema: ToolParameterSchema,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    fn schema(self) -> ToolSchema {
        let Self {
            name,
            description,
            parameters,
            properties,
            required,
        } = self;
        let parameters = parameters.unwrap_or_else(|| {
            ToolParameterSchema::object(format!("{name} arguments"), properties, required)
        });
        ToolSchema::new(name, description, parameters)
    }

    pub fn build_async<F, Fut>(self, handler: F) -> ToolBox
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
    {
        let handler: AsyncToolFn = Arc::new(move |args, ctx| Box::pin(handler(args, ctx)));
        Arc::new(FunctionTool::new(self.schema(), handler))
    }

    pub fn build_sync<F>(self, handler: F) -> ToolBox
    where
        F: Fn(Value, ToolContext) -> anyhow::Result<ToolResult> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.build_async(move |args, ctx| {
            let handler = handler.clone();
            async move { handler(args, ctx) }
        })
    }
}

pub fn tool<F, Fut>(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: ToolParameterSchema,
    handler: F,
) -> ToolBox
where
    F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    ToolBuilder::new(name, description)
        .with_parameters(parameters)
        .build_async(handler)
}

pub fn tool_sync<F>(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: ToolParameterSchema,
    handler: F,
) -> ToolBox
where
    F: Fn(Value, ToolContext) -> anyhow::Result<ToolResult> + Send + Sync + 'static,
{
    ToolBuilder::new(name, description)
        .with_parameters(parameters)
        .build_sync(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn param_builder_produces_object_schema() {
        let lookup = ToolBuilder::new("airport_code", "Look up an IATA code")
            .with_param("city", ToolParameterSchema::string("City name"), true)
            .with_param("country", ToolParameterSchema::string("Country"), false)
            .build_async(|args, ctx| async move {
                let city = args["city"].as_str().unwrap_or_default();
                let code = if city.eq_ignore_ascii_case("mumbai") { "BOM" } else { "???" };
                Ok(ToolResult::text(&ctx, code))
            });

        let schema = serde_json::to_value(lookup.schema().parameters).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["city"]));
        assert!(schema["properties"]["country"].is_object());

        let ctx = ToolContext::new().with_call_id(Some("call-9".into()));
        let result = lookup.execute(json!({"city": "Mumbai"}), ctx).await.unwrap();
        assert_eq!(result.message().text_content(), "BOM");
        assert_eq!(result.message().tool_call_id(), Some("call-9"));
    }

    #[tokio::test]
    async fn sync_tool_reports_errors() {
        let nights = tool_sync(
            "nights",
            "Count nights between two day numbers",
            ToolParameterSchema::object(
                "Stay",
                [
                    ("check_in".to_string(), ToolParameterSchema::integer("Day of check-in")),
                    ("check_out".to_string(), ToolParameterSchema::integer("Day of check-out")),
                ]
                .into_iter()
                .collect(),
                vec!["check_in".into(), "check_out".into()],
            ),
            |args, ctx| {
                let check_in = args["check_in"].as_i64().unwrap_or_default();
                let check_out = args["check_out"].as_i64().unwrap_or_default();
                anyhow::ensure!(check_out > check_in, "check_out must follow check_in");
                Ok(ToolResult::text(&ctx, (check_out - check_in).to_string()))
            },
        );

        let ok = nights
            .execute(json!({"check_in": 3, "check_out": 7}), ToolContext::new())
            .await
            .unwrap();
        assert_eq!(ok.message().text_content(), "4");

        let err = nights
            .execute(json!({"check_in": 7, "check_out": 3}), ToolContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must follow"));
    }
}
