use std::sync::Arc;

use research_agent_model::ModelProvider;

use super::{GraphEvent, ResearchGraph};
use crate::model_client::{ModelClient, RetryPolicy, TranscriptFn};
use crate::tool::{AnyTool, Executor, Tool, ToolObject};

const DEFAULT_MAX_SEARCH_ITERATIONS: u32 = 3;
const DEFAULT_STEP_LIMIT: usize = 25;

/// [`ResearchGraph`] builder.
pub struct ResearchGraphBuilder {
    model_client: ModelClient,
    system_prompt: Option<String>,
    tools: Vec<Box<dyn ToolObject>>,
    max_search_iterations: u32,
    step_limit: usize,
    on_transcript: Option<TranscriptFn>,
    on_event: Option<Box<dyn Fn(&GraphEvent) + Send + Sync>>,
}

impl ResearchGraphBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            tools: vec![],
            max_search_iterations: DEFAULT_MAX_SEARCH_ITERATIONS,
            step_limit: DEFAULT_STEP_LIMIT,
            on_transcript: None,
            on_event: None,
        }
    }

    /// Sets the system prompt sent ahead of every conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(AnyTool(tool)));
        self
    }

    /// Sets how many times `web_search` may run per query. `0` makes the
    /// model answer right away.
    #[inline]
    pub fn with_max_search_iterations(mut self, max: u32) -> Self {
        self.max_search_iterations = max;
        self
    }

    /// Sets how many nodes one run may visit.
    #[inline]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Sets how failed model calls are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.model_client = self.model_client.with_retry_policy(retry_policy);
        self
    }

    /// Attaches a callback receiving the model's text as it streams in.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback receiving [`GraphEvent`]s.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&GraphEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Builds the graph.
    pub fn build(self) -> ResearchGraph {
        let executor = Executor::with_tools(self.tools);
        if executor.is_empty() {
            warn!("no tools registered, the model will answer without searching");
        }
        ResearchGraph {
            model_client: self.model_client,
            executor,
            system_prompt: self.system_prompt,
            max_search_iterations: self.max_search_iterations,
            step_limit: self.step_limit,
            on_transcript: self
                .on_transcript
                .unwrap_or_else(|| Arc::new(|_: &str| {})),
            on_event: self.on_event,
        }
    }
}
