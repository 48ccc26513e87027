use research_agent_core::tool::{Error as ToolError, Tool, ToolOutput, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::search::SearchBackend;

/// Arguments of a `web_search` call.
#[derive(Deserialize, JsonSchema)]
pub struct WebSearchParameters {
    /// The search query.
    #[schemars(description = "What to search the web for.")]
    pub query: String,
}

/// A tool for searching the web through a [`SearchBackend`].
pub struct WebSearchTool {
    backend: SearchBackend,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates a web search tool backed by `backend`.
    #[inline]
    pub fn new(backend: SearchBackend) -> Self {
        WebSearchTool {
            backend,
            parameter_schema: schema_for!(WebSearchParameters).to_value(),
        }
    }
}

impl Tool for WebSearchTool {
    type Input = WebSearchParameters;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn describe_call(&self, input: &WebSearchParameters) -> String {
        format!("Searched for: {}", input.query)
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WebSearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let backend = self.backend.clone();
        async move {
            let results = backend.search(&input.query).await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
            let mut output = ToolOutput::new(results.to_tool_content());
            output.sources = results.sources();
            Ok(output)
        }
    }
}
