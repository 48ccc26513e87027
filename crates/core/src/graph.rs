//! The research graph.

mod builder;
mod topology;

use std::fmt::{self, Display};
use std::sync::Arc;

use research_agent_model::{
    ErrorKind, ModelMessage, ModelProviderError, ModelRequest, ToolCallResult,
};
use tracing::Instrument;

pub use builder::ResearchGraphBuilder;
pub use topology::{Edge, Topology};

use crate::model_client::{ModelClient, TranscriptFn};
use crate::state::ResearchState;
use crate::tool::Executor;

/// A node of the research graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// Sends the conversation to the model.
    CallModel,
    /// Runs the tool calls the model asked for.
    WebSearch,
    /// Ends the run.
    FinalAnswer,
}

impl Node {
    /// Returns the name of the node.
    pub fn name(self) -> &'static str {
        match self {
            Node::CallModel => "call_model",
            Node::WebSearch => "web_search",
            Node::FinalAnswer => "final_answer",
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress reported while the graph runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphEvent {
    /// The graph entered a node.
    NodeStarted(Node),
    /// A tool call is about to run. Carries its research step.
    ToolCallStarted(String),
}

/// The error type of a research run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model provider failed, after retries if the failure was transient.
    #[error("model request failed: {error}")]
    Model {
        /// Kind reported by the provider.
        kind: ErrorKind,
        /// The provider's error.
        error: Box<dyn ModelProviderError>,
    },
    /// The graph visited more nodes than allowed.
    #[error("research graph exceeded the limit of {0} steps")]
    StepLimitExceeded(usize),
}

impl Error {
    /// Returns the provider's error kind, if the model failed.
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model { kind, .. } => Some(*kind),
            Error::StepLimitExceeded(_) => None,
        }
    }
}

impl From<Box<dyn ModelProviderError>> for Error {
    fn from(error: Box<dyn ModelProviderError>) -> Self {
        Self::Model {
            kind: error.kind(),
            error,
        }
    }
}

/// The fixed research workflow: `call_model`, then `web_search` and back
/// while the model asks for searches and the budget lasts, then
/// `final_answer`.
///
/// Every [`invoke`](Self::invoke) starts from a fresh [`ResearchState`], so
/// one graph serves any number of queries.
pub struct ResearchGraph {
    model_client: ModelClient,
    executor: Executor,
    system_prompt: Option<String>,
    max_search_iterations: u32,
    step_limit: usize,
    on_transcript: TranscriptFn,
    on_event: Option<Box<dyn Fn(&GraphEvent) + Send + Sync>>,
}

impl ResearchGraph {
    /// Returns the nodes and edges of the graph.
    pub fn topology() -> Topology {
        Topology::research()
    }

    /// Returns the search budget.
    #[inline]
    pub fn max_search_iterations(&self) -> u32 {
        self.max_search_iterations
    }

    /// Runs `query` through the graph to completion.
    pub async fn invoke(&self, query: &str) -> Result<ResearchState, Error> {
        self.run(query).instrument(info_span!("research", query)).await
    }

    async fn run(&self, query: &str) -> Result<ResearchState, Error> {
        let mut state = ResearchState::new(query);
        let mut node = Node::CallModel;
        let mut steps = 0;
        loop {
            steps += 1;
            if steps > self.step_limit {
                error!("step limit of {} exceeded", self.step_limit);
                return Err(Error::StepLimitExceeded(self.step_limit));
            }
            debug!("entering node `{node}`");
            self.emit(GraphEvent::NodeStarted(node));

            node = match node {
                Node::CallModel => {
                    self.call_model(&mut state).await?;
                    self.route(&state)
                }
                Node::WebSearch => {
                    self.web_search(&mut state).await;
                    Node::CallModel
                }
                Node::FinalAnswer => {
                    info!(
                        "research finished after {} search(es)",
                        state.search_iterations
                    );
                    return Ok(state);
                }
            };
        }
    }

    fn emit(&self, event: GraphEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(&event);
        }
    }

    fn search_budget_left(&self, state: &ResearchState) -> bool {
        state.search_iterations < self.max_search_iterations
    }

    async fn call_model(&self, state: &mut ResearchState) -> Result<(), Error> {
        let mut messages = Vec::with_capacity(state.conversation.items.len() + 1);
        if let Some(system_prompt) = &self.system_prompt {
            messages.push(ModelMessage::System(system_prompt.clone()));
        }
        messages.extend(state.conversation.messages().cloned());

        let tools = if self.search_budget_left(state) {
            self.executor.definitions()
        } else {
            debug!("search budget spent, asking for an answer");
            vec![]
        };

        let resp = self
            .model_client
            .send_request(
                ModelRequest { messages, tools },
                Arc::clone(&self.on_transcript),
            )
            .await?;
        trace!(
            "model finished with {:?} and {} tool call(s)",
            resp.finish_reason,
            resp.tool_calls.len()
        );

        let msg = match resp.opaque_msg {
            Some(opaque_msg) => ModelMessage::Opaque(opaque_msg),
            None => ModelMessage::Assistant(resp.transcript.clone()),
        };
        state.conversation.push(msg, resp.transcript);
        state.pending_tool_calls = resp.tool_calls;
        Ok(())
    }

    fn route(&self, state: &ResearchState) -> Node {
        if !state.pending_tool_calls.is_empty() && self.search_budget_left(state) {
            Node::WebSearch
        } else {
            Node::FinalAnswer
        }
    }

    async fn web_search(&self, state: &mut ResearchState) {
        for req in std::mem::take(&mut state.pending_tool_calls) {
            let call = self.executor.prepare(req);
            if let Some(step) = &call.step {
                self.emit(GraphEvent::ToolCallStarted(step.clone()));
            }
            let name = call.name.clone();
            let (id, step, result) = call.run().await;

            let content = match result {
                Ok(output) => {
                    for source in output.sources {
                        state.add_source(source);
                    }
                    output.content
                }
                Err(err) => {
                    warn!("tool `{name}` failed: {err}");
                    format!("Error: {}", err.reason())
                }
            };
            if let Some(step) = step {
                state.add_step(step);
            }
            state.conversation.push(
                ModelMessage::Tool(ToolCallResult {
                    id,
                    content: content.clone(),
                }),
                content,
            );
        }
        state.search_iterations += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::Mutex;

    use research_agent_mock_model::{
        MockModelProvider, PresetEvent, PresetResponse, RESEARCH_PRESET_ANSWER,
    };
    use research_agent_model::ToolCallRequest;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::RetryPolicy;
    use crate::tool::{Tool, ToolOutput, ToolResult};

    #[derive(Deserialize)]
    struct SearchInput {
        query: String,
    }

    struct StubSearch {
        schema: Value,
    }

    impl StubSearch {
        fn new() -> Self {
            Self {
                schema: json!({
                    "type": "object",
                    "properties": { "query": { "type": "string" } },
                    "required": ["query"],
                }),
            }
        }
    }

    impl Tool for StubSearch {
        type Input = SearchInput;

        fn name(&self) -> &str {
            "web_search"
        }

        fn description(&self) -> &str {
            "Search the web for information."
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn describe_call(&self, input: &SearchInput) -> String {
            format!("Searched for: {}", input.query)
        }

        fn execute(
            &self,
            input: SearchInput,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(ToolOutput::new(format!("Results for '{}'", input.query))
                .with_source("Web search results")))
        }
    }

    fn search_turn(id: &str, query: &str) -> PresetResponse {
        PresetResponse::with_events([
            PresetEvent::MessageDelta("Searching.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: id.to_owned(),
                name: "web_search".to_owned(),
                arguments: json!({ "query": query }),
            }),
        ])
    }

    fn answer_turn(text: &str) -> PresetResponse {
        PresetResponse::with_events([PresetEvent::MessageDelta(text.to_owned())])
    }

    #[tokio::test]
    async fn test_research_preset_run() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let transcript = Arc::new(Mutex::new(String::new()));
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::research_preset(),
        )
        .with_tool(StubSearch::new())
        .on_event({
            let events = Arc::clone(&events);
            move |event| events.lock().unwrap().push(event.clone())
        })
        .on_transcript({
            let transcript = Arc::clone(&transcript);
            move |delta| transcript.lock().unwrap().push_str(delta)
        })
        .build();

        let state = graph.invoke("What are research agents?").await.unwrap();
        assert_eq!(state.final_answer(), RESEARCH_PRESET_ANSWER);
        assert_eq!(
            state.research_steps(),
            ["Searched for: research agent information"]
        );
        assert_eq!(state.sources(), ["Web search results"]);
        assert_eq!(state.search_iterations(), 1);
        // query, assistant, tool result, assistant
        assert_eq!(state.conversation().items().len(), 4);
        assert!(state.conversation().items()[2].is_tool_result());
        assert!(transcript.lock().unwrap().ends_with(RESEARCH_PRESET_ANSWER));

        assert_eq!(
            *events.lock().unwrap(),
            [
                GraphEvent::NodeStarted(Node::CallModel),
                GraphEvent::NodeStarted(Node::WebSearch),
                GraphEvent::ToolCallStarted(
                    "Searched for: research agent information".to_owned()
                ),
                GraphEvent::NodeStarted(Node::CallModel),
                GraphEvent::NodeStarted(Node::FinalAnswer),
            ]
        );

        // A fresh state for every query.
        let again = graph.invoke("What are research agents?").await.unwrap();
        assert_eq!(again.final_answer(), RESEARCH_PRESET_ANSWER);
        assert_eq!(again.research_steps().len(), 1);
    }

    #[tokio::test]
    async fn test_search_budget() {
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::with_script([
                search_turn("call_1", "first"),
                search_turn("call_2", "second"),
                answer_turn("unreachable"),
            ]),
        )
        .with_tool(StubSearch::new())
        .with_max_search_iterations(1)
        .build();

        let state = graph.invoke("q").await.unwrap();
        assert_eq!(state.search_iterations(), 1);
        assert_eq!(state.research_steps(), ["Searched for: first"]);
        assert_eq!(state.final_answer(), "Searching.");
    }

    #[tokio::test]
    async fn test_sources_listed_per_search() {
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::with_script([
                search_turn("call_1", "alpha"),
                search_turn("call_2", "beta"),
                answer_turn("Done."),
            ]),
        )
        .with_tool(StubSearch::new())
        .build();

        let state = graph.invoke("q").await.unwrap();
        assert_eq!(
            state.research_steps(),
            ["Searched for: alpha", "Searched for: beta"]
        );
        assert_eq!(state.sources(), ["Web search results", "Web search results"]);
        assert_eq!(state.search_iterations(), 2);
    }

    #[tokio::test]
    async fn test_no_tool_calls_goes_to_final_answer() {
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::with_script([answer_turn("Just an answer.")]),
        )
        .with_tool(StubSearch::new())
        .build();

        let state = graph.invoke("q").await.unwrap();
        assert_eq!(state.final_answer(), "Just an answer.");
        assert_eq!(state.search_iterations(), 0);
        assert!(state.sources().is_empty());
    }

    #[tokio::test]
    async fn test_tool_errors_are_fed_back() {
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::with_script([
                PresetResponse::with_events([
                    PresetEvent::ToolCall(ToolCallRequest {
                        id: "call_1".to_owned(),
                        name: "read_file".to_owned(),
                        arguments: json!({ "path": "/etc/passwd" }),
                    }),
                    PresetEvent::ToolCall(ToolCallRequest {
                        id: "call_2".to_owned(),
                        name: "web_search".to_owned(),
                        arguments: json!({ "q": "missing field" }),
                    }),
                ]),
                answer_turn("Done."),
            ]),
        )
        .with_tool(StubSearch::new())
        .build();

        let state = graph.invoke("q").await.unwrap();
        let items = state.conversation().items();
        assert_eq!(items.len(), 5);
        assert_eq!(items[2].transcript(), "Error: no tool named `read_file`");
        assert!(items[3].transcript().starts_with("Error: missing field"));
        assert!(state.research_steps().is_empty());
        assert_eq!(state.search_iterations(), 1);
        assert_eq!(state.final_answer(), "Done.");
    }

    #[tokio::test]
    async fn test_step_limit() {
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::research_preset(),
        )
        .with_tool(StubSearch::new())
        .with_step_limit(2)
        .build();

        let err = graph.invoke("q").await.unwrap_err();
        assert!(matches!(err, Error::StepLimitExceeded(2)));
        assert_eq!(err.model_error_kind(), None);
    }

    #[tokio::test]
    async fn test_model_error() {
        let graph = ResearchGraphBuilder::with_model_provider(
            MockModelProvider::with_script([answer_turn("never").with_failures(0)]),
        )
        .with_retry_policy(RetryPolicy::NONE)
        .build();

        let err = graph.invoke("q").await.unwrap_err();
        assert_eq!(err.model_error_kind(), Some(ErrorKind::RateLimitExceeded));
        assert!(err.to_string().starts_with("model request failed"));
    }
}
